//! Pattern groups evaluated by the safety gate.
//!
//! Patterns are authored for Portuguese plus common unaccented spellings and
//! are matched against trimmed, lowercased input. Every group is compiled
//! case-insensitively.

/// Attempts to disable the rules, assume an unrestricted persona, or known
/// jailbreak phrasings.
pub const JAILBREAK: &[&str] = &[
    r"\b(ignore|ignora|esqueça|esqueca) (suas|as|todas as|todas suas) (instruções|instrucoes|regras|diretrizes)\b",
    r"\bignore (all |your |the )?(previous |prior )?(instructions|rules)\b",
    r"\bfinja que (você é|voce é|voce e|não tem|nao tem|pode)\b",
    r"\bmodo (desenvolvedor|sem restrições|sem restricoes|sem filtro|desbloqueado)\b",
    r"\b(dan|do anything now|jailbreak|bypass)\b",
    r"\b(aja|atue) como uma ia sem (regras|limites|restrições|restricoes)\b",
    r"\b(sua (verdadeira|real) programação|seu (verdadeiro|real) eu)\b",
];

/// Self-harm and suicidal intent.
pub const SELF_HARM: &[&str] = &[
    r"\bcomo (me matar|me suicidar|suicidar|me machucar|me cortar)\b",
    r"\bmétodos?.{0,20}\bsuic[ií]dio\b",
    r"\bquero (morrer|me matar)\b",
    r"\bpensando em (suic[ií]dio|me matar)\b",
];

/// Crime, illegal activity and explicit sexual content, checked as one set.
pub const BLOCKED: &[&str] = &[
    r"\b(como (fazer|fabricar|sintetizar|criar|montar)|tutorial|passo a passo).{0,40}\b(bomb[ao]s?|explosiv[oa]s?|armas?|veneno|drogas?|meth|crack|cocaína|cocaina)\b",
    r"\b(hackear|hack|invadir|crackear).{0,30}\b(sistemas?|servidor(es)?|contas?|banco|redes?)\b",
    r"\b(como (matar|assassinar|envenenar)|plano (para matar|de assassinato))\b",
    r"\b(pedofilia|pedófil\w*|abuso (infantil|de menores)|criança.{0,20}\b(sexual|nua|pelada))\b",
    r"\b(terroris(mo|ta)s?|ataque (terrorista|suicida)|explosão.{0,20}\b(shopping|escola|evento))\b",
    r"\b(tráfico (de pessoas|de drogas|humano)|escravidão moderna)\b",
    r"\b(fraude.{0,20}\b(cartão|cartao|banco|eleitoral)|lavagem de dinheiro)\b",
    r"\b(ransomware|malware|keylogger|phishing|ddos)\b",
    r"\b(pornografia|pornográfic[oa]s?|conteúdo (adulto|sexual|erótico|explícito))\b",
    r"\bsexo (com|entre).{0,20}\b(menor(es)?|crianças?|animal|animais)\b",
    r"\b(nudes?|foto (nua|pelad[ao])|conteúdo íntimo)\b",
];

/// Words that mark a match from [`BLOCKED`] as sexual content rather than crime.
pub const EXPLICIT_MARKERS: &[&str] = &[
    "pornogr", "sexo", "sexual", "nude", "nua", "pelad", "erótico", "explícito", "adulto", "íntimo",
];

const PRETEXT: &str = r"(para|pra) (um |uma |o |a |meu |minha )?(estudar|estudo|pesquisa|trabalho|projeto|prova|aula|tcc|seminário|feira de ciências)|fins (acadêmicos|academicos|educacionais|didáticos|de pesquisa)";

const HARMFUL_REQUEST: &str = r"\b(como (fazer|fabricar|sintetizar|criar|montar|produzir)|receita|passo a passo|tutorial)\b.{0,40}\b(bomb[ao]s?|explosiv[oa]s?|armas?|veneno|drogas?)\b|\b(hackear|invadir|crackear)\b";

/// A study or research pretext wrapped around a harmful request, in either order.
pub fn study_pretext() -> Vec<String> {
    vec![
        format!(r"\b({PRETEXT})\b.{{0,60}}({HARMFUL_REQUEST})"),
        format!(r"({HARMFUL_REQUEST}).{{0,60}}\b({PRETEXT})\b"),
    ]
}
