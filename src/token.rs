//! Interning of lines and words into compact integer tokens.
//!
//! The matching algorithms never compare strings directly. Whole lines are
//! interned for patience matching and offset search, and lines are split into
//! words which are interned for fuzzy (edit distance) matching.

use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::sync::Arc;
use unicode_general_category::{get_general_category, GeneralCategory};

/// An interned line or word identifier.
pub type Token = u32;

/// The word tokens of a single line, shared between the cache and its users.
pub type WordTokens = Arc<[Token]>;

/// Tokens below this value are reserved: a word consisting of a single
/// character `c <= 0x80` is its own token.
pub const RESERVED_TOKENS: Token = 0x81;

/// Maps lines and words to tokens for the lifetime of one diff or patch session.
///
/// Equal text always yields an equal token within one mapper. The tables only
/// grow; they are dropped with the mapper.
#[derive(Debug, Default)]
pub struct TokenMapper {
    line_to_id: FxHashMap<Arc<str>, Token>,
    id_to_line: Vec<Arc<str>>,
    word_to_id: FxHashMap<Arc<str>, Token>,
    id_to_word: Vec<Arc<str>>,
    word_cache: FxHashMap<Arc<str>, WordTokens>,
    buf: Vec<Token>,
}

impl TokenMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// One past the highest line token handed out so far.
    pub fn max_line_id(&self) -> Token {
        RESERVED_TOKENS + self.id_to_line.len() as Token
    }

    /// One past the highest word token handed out so far.
    pub fn max_word_id(&self) -> Token {
        RESERVED_TOKENS + self.id_to_word.len() as Token
    }

    /// Interns a whole line.
    pub fn intern_line(&mut self, line: &str) -> Token {
        if let Some(&id) = self.line_to_id.get(line) {
            return id;
        }
        let id = self.max_line_id();
        let text: Arc<str> = Arc::from(line);
        self.id_to_line.push(text.clone());
        self.line_to_id.insert(text, id);
        id
    }

    /// Interns every line of a sequence, in order.
    pub fn intern_lines<T: AsRef<str>>(&mut self, lines: &[T]) -> Vec<Token> {
        lines.iter().map(|l| self.intern_line(l.as_ref())).collect()
    }

    /// Interns a single word. Single characters up to `0x80` map to their own
    /// code point and never touch the table.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftpatch::TokenMapper;
    /// let mut mapper = TokenMapper::new();
    /// assert_eq!(mapper.intern_word(","), ',' as u32);
    /// let foo = mapper.intern_word("foo");
    /// assert_eq!(mapper.intern_word("foo"), foo);
    /// assert_eq!(mapper.resolve_word(foo), "foo");
    /// ```
    pub fn intern_word(&mut self, word: &str) -> Token {
        let mut chars = word.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if (c as u32) < RESERVED_TOKENS {
                return c as Token;
            }
        }
        if let Some(&id) = self.word_to_id.get(word) {
            return id;
        }
        let id = self.max_word_id();
        let text: Arc<str> = Arc::from(word);
        self.id_to_word.push(text.clone());
        self.word_to_id.insert(text, id);
        id
    }

    /// Splits a line with [`split_words`] and interns each word.
    ///
    /// Results are memoized per distinct line, so repeated lines across hunks
    /// and files are only tokenized once.
    pub fn tokenize(&mut self, line: &str) -> WordTokens {
        if let Some(cached) = self.word_cache.get(line) {
            return cached.clone();
        }

        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        for word in split_words(line) {
            buf.push(self.intern_word(word));
        }
        let tokens: WordTokens = Arc::from(buf.as_slice());
        self.buf = buf;

        self.word_cache.insert(Arc::from(line), tokens.clone());
        tokens
    }

    /// Tokenizes every line of a sequence, in order.
    pub fn tokenize_lines<T: AsRef<str>>(&mut self, lines: &[T]) -> Vec<WordTokens> {
        lines.iter().map(|l| self.tokenize(l.as_ref())).collect()
    }

    /// Returns the text of a line token.
    ///
    /// Panics if the token was not produced by this mapper.
    pub fn resolve_line(&self, token: Token) -> &str {
        token
            .checked_sub(RESERVED_TOKENS)
            .and_then(|i| self.id_to_line.get(i as usize))
            .unwrap_or_else(|| panic!("line token {token} was never interned"))
    }

    /// Returns the text of a word token.
    ///
    /// Panics if the token was not produced by this mapper.
    pub fn resolve_word(&self, token: Token) -> Cow<'_, str> {
        if token < RESERVED_TOKENS {
            let c = char::from_u32(token)
                .unwrap_or_else(|| panic!("word token {token} is not a character"));
            return Cow::Owned(c.to_string());
        }
        let word = self
            .id_to_word
            .get((token - RESERVED_TOKENS) as usize)
            .unwrap_or_else(|| panic!("word token {token} was never interned"));
        Cow::Borrowed(word)
    }
}

/// Splits a line into words.
///
/// A word is one of:
/// - a letter followed by any letters or digits,
/// - a run of digits,
/// - a run of spaces, or a run of tabs (never mixed),
/// - any other single character.
///
/// A letter is any code point of general category `L*` and a digit is a
/// decimal digit (`Nd`). Other numerals such as `²` or `Ⅻ` are single
/// characters.
///
/// # Example
///
/// ```
/// # use driftpatch::split_words;
/// let words: Vec<_> = split_words("foo_bar(12,\tx1)").collect();
/// assert_eq!(words, vec!["foo", "_", "bar", "(", "12", ",", "\t", "x1", ")"]);
/// ```
pub fn split_words(line: &str) -> impl Iterator<Item = &str> + '_ {
    let mut rest = line;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let width = first.len_utf8();
        let end = if is_letter(first) {
            run_end(rest, width, |c| is_letter(c) || is_digit(c))
        } else if is_digit(first) {
            run_end(rest, width, is_digit)
        } else if first == ' ' || first == '\t' {
            run_end(rest, width, |c| c == first)
        } else {
            width
        };
        let (word, tail) = rest.split_at(end);
        rest = tail;
        Some(word)
    })
}

fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

fn is_digit(c: char) -> bool {
    matches!(get_general_category(c), GeneralCategory::DecimalNumber)
}

fn run_end(s: &str, from: usize, continues: impl Fn(char) -> bool) -> usize {
    s[from..]
        .char_indices()
        .find(|&(_, c)| !continues(c))
        .map_or(s.len(), |(i, _)| from + i)
}
