//! Sport canonicalization against a fixed catalog.

use super::{collapse_whitespace, fold_text};

struct SportEntry {
    name: &'static str,
    emoji: &'static str,
    aliases: &'static [&'static str],
}

impl SportEntry {
    fn canonical(&self) -> String {
        format!("{} {}", self.name, self.emoji)
    }
}

const CATALOG: &[SportEntry] = &[
    SportEntry {
        name: "Futebol",
        emoji: "⚽",
        aliases: &["soccer", "football", "futbol", "fútbol", "futebol de campo"],
    },
    SportEntry {
        name: "Futebol Americano",
        emoji: "🏈",
        aliases: &["american football", "nfl", "ncaaf"],
    },
    SportEntry {
        name: "Basquete",
        emoji: "🏀",
        aliases: &["basketball", "basquetebol", "baloncesto", "nba", "nbb", "euroliga", "euroleague"],
    },
    SportEntry {
        name: "Tênis",
        emoji: "🎾",
        aliases: &["tennis", "tenis", "atp", "wta"],
    },
    SportEntry {
        name: "Tênis de Mesa",
        emoji: "🏓",
        aliases: &["table tennis", "ping pong", "pingpong"],
    },
    SportEntry {
        name: "Vôlei",
        emoji: "🏐",
        aliases: &["volei", "voleibol", "volleyball", "volley"],
    },
    SportEntry {
        name: "Beisebol",
        emoji: "⚾",
        aliases: &["baseball", "mlb"],
    },
    SportEntry {
        name: "Hóquei no Gelo",
        emoji: "🏒",
        aliases: &["hoquei", "hockey", "ice hockey", "nhl"],
    },
    SportEntry {
        name: "MMA",
        emoji: "🥊",
        aliases: &["ufc", "artes marciais mistas", "mixed martial arts"],
    },
    SportEntry {
        name: "Boxe",
        emoji: "🥊",
        aliases: &["boxing", "boxeo"],
    },
    SportEntry {
        name: "Handebol",
        emoji: "🤾",
        aliases: &["handball", "handebol de salao"],
    },
    SportEntry {
        name: "Futsal",
        emoji: "⚽",
        aliases: &["futebol de salao", "indoor soccer"],
    },
    SportEntry {
        name: "eSports",
        emoji: "🎮",
        aliases: &["esport", "e sports", "counter strike", "cs2", "csgo", "dota", "dota 2", "league of legends", "lol", "valorant"],
    },
    SportEntry {
        name: "Fórmula 1",
        emoji: "🏎️",
        aliases: &["formula 1", "f1", "formula one"],
    },
    SportEntry {
        name: "Golfe",
        emoji: "⛳",
        aliases: &["golf"],
    },
    SportEntry {
        name: "Rugby",
        emoji: "🏉",
        aliases: &["rugbi", "rugby union", "rugby league"],
    },
    SportEntry {
        name: "Críquete",
        emoji: "🏏",
        aliases: &["cricket", "criquete"],
    },
    SportEntry {
        name: "Dardos",
        emoji: "🎯",
        aliases: &["darts"],
    },
    SportEntry {
        name: "Sinuca",
        emoji: "🎱",
        aliases: &["snooker", "bilhar"],
    },
    SportEntry {
        name: "Ciclismo",
        emoji: "🚴",
        aliases: &["cycling"],
    },
];

/// Shortest folded term eligible for typo tolerance
const FUZZY_MIN_LEN: usize = 5;

/// Every folded name and alias paired with its catalog entry
fn folded_terms() -> Vec<(String, &'static SportEntry)> {
    CATALOG
        .iter()
        .flat_map(|entry| {
            std::iter::once(entry.name)
                .chain(entry.aliases.iter().copied())
                .map(move |term| (fold_text(term), entry))
        })
        .collect()
}

/// Map free-form sport text to its canonical `"<Name> <emoji>"` form
///
/// Matching is diacritic and case insensitive and ignores emoji: exact
/// name/alias first, then the longest alias contained as whole words, then
/// a single-edit typo on terms of at least five characters. Unknown sports
/// come back trimmed with decorations removed.
pub fn normalize_sport(raw: &str) -> String {
    let folded = fold_text(raw);
    if folded.is_empty() {
        return String::new();
    }

    let terms = folded_terms();

    if let Some((_, entry)) = terms.iter().find(|(term, _)| *term == folded) {
        return entry.canonical();
    }

    let padded = format!(" {folded} ");
    let contained = terms
        .iter()
        .filter(|(term, _)| padded.contains(&format!(" {term} ")))
        .max_by_key(|(term, _)| term.chars().count());
    if let Some((_, entry)) = contained {
        return entry.canonical();
    }

    if folded.chars().count() >= FUZZY_MIN_LEN {
        let near = terms.iter().find(|(term, _)| {
            term.chars().count() >= FUZZY_MIN_LEN && within_one_edit(term, &folded)
        });
        if let Some((_, entry)) = near {
            return entry.canonical();
        }
    }

    strip_decorations(raw)
}

fn strip_decorations(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '\'' | '.' | '/'))
        .collect();
    collapse_whitespace(&kept)
}

/// Levenshtein distance of at most one, without building the full matrix
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if long.len() - short.len() > 1 {
        return false;
    }

    let mut i = 0;
    let mut j = 0;
    let mut edits = 0;
    while i < short.len() && j < long.len() {
        if short[i] == long[j] {
            i += 1;
            j += 1;
            continue;
        }
        edits += 1;
        if edits > 1 {
            return false;
        }
        if short.len() == long.len() {
            i += 1;
        }
        j += 1;
    }
    edits + (long.len() - j) + (short.len() - i) <= 1
}
