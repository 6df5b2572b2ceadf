// Text Processing Service
// Word/sentence tokenization and syllable estimation shared by the stylometry engine

use regex::Regex;
use std::sync::OnceLock;

const APOSTROPHES: [char; 2] = ['\'', '\u{2019}'];
/// Quotes and brackets that may trail a sentence terminal.
pub(crate) const CLOSERS: [char; 7] = ['"', '\'', '\u{201d}', '\u{2019}', ')', ']', '}'];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}'\u{2019}\-]+").expect("word regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

/// Split text into words. Letters, apostrophes and hyphens are word
/// characters; leading/trailing apostrophes and hyphens are dropped and
/// typographic apostrophes are folded to `'`.
pub fn tokenize_words(text: &str) -> Vec<String> {
    word_re()
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m
                .as_str()
                .trim_matches(|c: char| c == '-' || APOSTROPHES.contains(&c));
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.replace('\u{2019}', "'"))
            }
        })
        .collect()
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace or
/// end of text. Runs like `?!` or `...` form one boundary, closing quotes
/// and brackets stay with their sentence, and fragments without any word
/// are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        buffer.push(ch);

        if is_terminal(ch) {
            while i + 1 < chars.len() && is_terminal(chars[i + 1]) {
                i += 1;
                buffer.push(chars[i]);
            }
            while i + 1 < chars.len() && CLOSERS.contains(&chars[i + 1]) {
                i += 1;
                buffer.push(chars[i]);
            }
            let at_boundary = i + 1 >= chars.len() || chars[i + 1].is_whitespace();
            if at_boundary {
                push_sentence(&mut sentences, &buffer);
                buffer.clear();
            }
        }

        i += 1;
    }

    push_sentence(&mut sentences, &buffer);
    sentences
}

fn push_sentence(out: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if word_re().find_iter(trimmed).any(|m| m.as_str().chars().any(char::is_alphabetic)) {
        out.push(trimmed.to_string());
    }
}

fn is_vowel(c: char) -> bool {
    matches!(
        c,
        'a' | 'e' | 'i' | 'o' | 'u' | 'y' | 'à' | 'á' | 'â' | 'ä' | 'é' | 'è' | 'ê' | 'ë' | 'í'
            | 'ì' | 'î' | 'ï' | 'ó' | 'ò' | 'ô' | 'ö' | 'ú' | 'ù' | 'û' | 'ü'
    )
}

/// Vowel-cluster syllable estimate. Every word with letters counts at least one.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    // Silent trailing "e" (but "-le" keeps its syllable: ta-ble)
    let n = letters.len();
    if n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && count > 1 {
        count -= 1;
    }

    count.max(1)
}
