//! The built-in subject table.
//!
//! Keywords are lowercase because they are matched as substrings of lowercased
//! input. Declaration order is significant: it breaks score ties between
//! subjects and decides which topic wins when several match.

use serde::Serialize;

/// A sub-category inside a subject.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Topic {
    pub key: &'static str,
    pub keywords: &'static [&'static str],
}

/// A top-level academic subject.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Subject {
    pub key: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub keywords: &'static [&'static str],
    pub topics: &'static [Topic],
}

/// Read-only table of subjects in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy {
    subjects: &'static [Subject],
}

const FALLBACK_ICON: &str = "📚";

static BUILTIN: Taxonomy = Taxonomy::new(SUBJECTS);

impl Taxonomy {
    pub const fn new(subjects: &'static [Subject]) -> Self {
        Self { subjects }
    }

    /// The process-wide table shipped with Doki.
    pub fn builtin() -> &'static Taxonomy {
        &BUILTIN
    }

    pub fn subjects(&self) -> &'static [Subject] {
        self.subjects
    }

    pub fn get(&self, key: &str) -> Option<&'static Subject> {
        self.subjects.iter().find(|s| s.key == key)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Display name for `key`, or the capitalized key when it is unknown.
    pub fn display_name(&self, key: &str) -> String {
        match self.get(key) {
            Some(subject) => subject.display_name.to_string(),
            None => capitalize(key),
        }
    }

    /// Icon for `key`, or a generic book when it is unknown.
    pub fn icon(&self, key: &str) -> &'static str {
        self.get(key).map(|s| s.icon).unwrap_or(FALLBACK_ICON)
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

const SUBJECTS: &[Subject] = &[
    Subject {
        key: "matematica",
        display_name: "Matemática",
        icon: "📐",
        keywords: &[
            "equação", "função", "derivada", "integral", "limite", "matriz", "vetor",
            "geometria", "trigonometria", "logaritmo", "polinômio", "probabilidade",
            "estatística", "álgebra", "cálculo", "número", "fração", "porcentagem",
            "raiz", "potência", "progressão", "combinatória", "permutação",
        ],
        topics: &[
            Topic {
                key: "calculo",
                keywords: &["derivada", "integral", "limite", "cálculo diferencial", "cálculo integral"],
            },
            Topic {
                key: "algebra",
                keywords: &["equação", "sistema linear", "matriz", "determinante", "vetor"],
            },
            Topic {
                key: "geometria",
                keywords: &["triângulo", "círculo", "polígono", "área", "volume", "perímetro"],
            },
            Topic {
                key: "estatistica",
                keywords: &["média", "mediana", "moda", "desvio padrão", "distribuição"],
            },
        ],
    },
    Subject {
        key: "fisica",
        display_name: "Física",
        icon: "⚛️",
        keywords: &[
            "força", "energia", "velocidade", "aceleração", "massa", "gravitação",
            "eletricidade", "magnetismo", "onda", "luz", "calor", "termodinâmica",
            "mecânica", "óptica", "relatividade", "quântic", "partícula", "pressão",
            "trabalho", "potência", "campo elétrico", "campo magnético", "circuito",
        ],
        topics: &[
            Topic {
                key: "mecanica",
                keywords: &["força", "velocidade", "aceleração", "trabalho", "energia cinética"],
            },
            Topic {
                key: "eletromagnetismo",
                keywords: &["eletricidade", "magnetismo", "campo elétrico", "circuito"],
            },
            Topic {
                key: "termodinamica",
                keywords: &["calor", "temperatura", "entropia", "termodinâmica"],
            },
            Topic {
                key: "optica",
                keywords: &["luz", "refração", "reflexão", "lente", "espelho"],
            },
        ],
    },
    Subject {
        key: "quimica",
        display_name: "Química",
        icon: "🧪",
        // No "ph": as a substring it fires on "phrase", "graph"... One keyword
        // fewer than the historical table, so confidences here run slightly higher.
        keywords: &[
            "átomo", "molécula", "reação", "elemento", "tabela periódica", "ligação",
            "ácido", "base", "sal", "óxido", "mol", "solução", "concentração",
            "oxidação", "redução", "orgânica", "inorgânica", "isômero", "polímero",
            "estequiometria", "equilíbrio químico", "cinética",
        ],
        topics: &[
            Topic {
                key: "organica",
                keywords: &["carbono", "hidrocarboneto", "álcool", "ácido orgânico", "isômero"],
            },
            Topic {
                key: "inorganica",
                keywords: &["tabela periódica", "ligação iônica", "ligação covalente"],
            },
            Topic {
                key: "fisicoquimica",
                keywords: &["equilíbrio", "cinética", "termodinâmica química", "eletroquímica"],
            },
        ],
    },
    Subject {
        key: "biologia",
        display_name: "Biologia",
        icon: "🧬",
        keywords: &[
            "célula", "dna", "rna", "proteína", "gene", "cromossomo", "evolução",
            "ecossistema", "fotossíntese", "respiração celular", "mitose", "meiose",
            "vírus", "bactéria", "fungo", "animal", "planta", "ecologia", "genética",
            "metabolismo", "enzima", "hormônio", "tecido", "órgão", "sistema",
        ],
        topics: &[
            Topic {
                key: "genetica",
                keywords: &["dna", "gene", "hereditariedade", "mutação", "cromossomo"],
            },
            Topic {
                key: "ecologia",
                keywords: &["ecossistema", "cadeia alimentar", "bioma", "população"],
            },
            Topic {
                key: "citologia",
                keywords: &["célula", "membrana", "mitocôndria", "núcleo", "organela"],
            },
            Topic {
                key: "evolucao",
                keywords: &["darwin", "seleção natural", "especiação", "fóssil"],
            },
        ],
    },
    Subject {
        key: "historia",
        display_name: "História",
        icon: "📜",
        keywords: &[
            "guerra", "revolução", "império", "república", "colônia", "independência",
            "ditadura", "democracia", "feudalismo", "capitalismo", "socialismo",
            "brasil", "europa", "antiguidade", "idade média", "renascimento",
            "iluminismo", "industrialização", "segunda guerra", "primeira guerra",
        ],
        topics: &[
            Topic {
                key: "brasil",
                keywords: &["colônia", "império", "república", "ditadura militar", "redemocratização"],
            },
            Topic {
                key: "geral",
                keywords: &["antiguidade", "idade média", "idade moderna", "idade contemporânea"],
            },
            Topic {
                key: "guerras",
                keywords: &["primeira guerra", "segunda guerra", "guerra fria", "guerra civil"],
            },
        ],
    },
    Subject {
        key: "geografia",
        display_name: "Geografia",
        icon: "🌍",
        keywords: &[
            "clima", "relevo", "hidrografia", "bioma", "urbanização", "população",
            "continente", "país", "capital", "latitude", "longitude", "mapa",
            "geopolítica", "globalização", "desenvolvimento", "idh", "pib",
        ],
        topics: &[],
    },
    Subject {
        key: "portugues",
        display_name: "Português",
        icon: "📝",
        keywords: &[
            "verbo", "substantivo", "adjetivo", "advérbio", "preposição", "conjunção",
            "oração", "sujeito", "predicado", "crase", "acento", "ortografia",
            "redação", "dissertação", "narração", "coesão", "coerência", "texto",
            "literatura", "poesia", "romance", "conto", "interpretação",
        ],
        topics: &[
            Topic {
                key: "gramatica",
                keywords: &["verbo", "substantivo", "crase", "concordância", "regência"],
            },
            Topic {
                key: "literatura",
                keywords: &["romantismo", "realismo", "modernismo", "poesia", "prosa"],
            },
            Topic {
                key: "redacao",
                keywords: &["dissertação", "argumentação", "coesão", "coerência"],
            },
        ],
    },
    Subject {
        key: "ingles",
        display_name: "Inglês",
        icon: "🇺🇸",
        keywords: &[
            "verb", "tense", "grammar", "vocabulary", "present", "past", "future",
            "reading", "writing", "speaking", "listening", "phrasal verb",
            "conditional", "modal", "passive voice", "reported speech",
        ],
        topics: &[],
    },
    Subject {
        key: "programacao",
        display_name: "Programação",
        icon: "💻",
        keywords: &[
            "código", "função", "variável", "loop", "array", "objeto", "classe",
            "python", "javascript", "java", "c++", "sql", "html", "css", "react",
            "algoritmo", "estrutura de dados", "banco de dados", "api", "recursão",
            "debug", "compilador", "framework", "biblioteca",
        ],
        topics: &[
            Topic {
                key: "python",
                keywords: &["python", "django", "flask", "pandas", "numpy"],
            },
            Topic {
                key: "web",
                keywords: &["html", "css", "javascript", "react", "api rest"],
            },
            Topic {
                key: "estrutura_dados",
                keywords: &["array", "lista", "pilha", "fila", "árvore", "grafo"],
            },
            Topic {
                key: "banco_dados",
                keywords: &["sql", "mysql", "postgresql", "nosql", "mongodb"],
            },
        ],
    },
    Subject {
        key: "filosofia",
        display_name: "Filosofia",
        icon: "🏛️",
        keywords: &[
            "ética", "moral", "epistemologia", "ontologia", "metafísica", "lógica",
            "sócrates", "platão", "aristóteles", "kant", "nietzsche", "descartes",
            "existencialismo", "empirismo", "racionalismo", "fenomenologia",
        ],
        topics: &[],
    },
    Subject {
        key: "matematica_financeira",
        display_name: "Matemática Financeira",
        icon: "💰",
        // "vp" and "tir" dropped for the same substring reason ("tirar", "vpn");
        // confidences differ from the historical table on purpose.
        keywords: &[
            "juros", "desconto", "amortização", "investimento", "rentabilidade",
            "taxa", "capitalização", "anuidade", "vpl", "payback",
        ],
        topics: &[],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_has_all_subjects_in_order() {
        let keys: Vec<_> = Taxonomy::builtin().subjects().iter().map(|s| s.key).collect();
        assert_eq!(keys.len(), 11);
        assert_eq!(keys[0], "matematica");
        assert_eq!(keys[10], "matematica_financeira");
    }

    #[test]
    fn keys_are_unique() {
        let taxonomy = Taxonomy::builtin();
        let keys: HashSet<_> = taxonomy.subjects().iter().map(|s| s.key).collect();
        assert_eq!(keys.len(), taxonomy.len());
    }

    #[test]
    fn keywords_are_lowercase() {
        for subject in Taxonomy::builtin().subjects() {
            let topic_keywords = subject.topics.iter().flat_map(|t| t.keywords.iter());
            for kw in subject.keywords.iter().chain(topic_keywords) {
                assert_eq!(*kw, kw.to_lowercase(), "{} has keyword {kw}", subject.key);
            }
        }
    }

    #[test]
    fn short_ambiguous_keywords_are_absent() {
        let taxonomy = Taxonomy::builtin();
        let quimica = taxonomy.get("quimica").unwrap();
        let financeira = taxonomy.get("matematica_financeira").unwrap();
        assert_eq!(quimica.keywords.len(), 22);
        assert_eq!(financeira.keywords.len(), 10);
        assert!(!quimica.keywords.contains(&"ph"));
        assert!(!financeira.keywords.contains(&"vp"));
        assert!(!financeira.keywords.contains(&"tir"));
    }

    #[test]
    fn lookups_for_known_subject() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.display_name("fisica"), "Física");
        assert_eq!(taxonomy.icon("programacao"), "💻");
    }

    #[test]
    fn lookups_default_for_unknown_subject() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.display_name("astronomia"), "Astronomia");
        assert_eq!(taxonomy.display_name("GERAL"), "Geral");
        assert_eq!(taxonomy.display_name(""), "");
        assert_eq!(taxonomy.icon("astronomia"), "📚");
    }
}
