use std::borrow::Cow;

use regex::Regex;

use lazy_static::lazy_static;

lazy_static! {

    static ref RE_SPACES: Regex = Regex::new(r" +").unwrap();

    static ref RE_LINE_BREAKS: Regex = Regex::new(r"[\r\t\n\x0b\x0c]+").unwrap();

    static ref TWEET_CLEANER: TextCleaner = TextCleaner::tweet();

    static ref ARTICLE_CLEANER: TextCleaner = TextCleaner::article();

}

/// Hyperlinks, either a token starting with `http` or any token with `.com`
/// in it.
const PATTERN_LINKS: &str = r"http\S+|\S+\.com\S+";

/// Links to hosted photos.
const PATTERN_PHOTOS: &str = r"pic\.\S+";

/// Usertags.
const PATTERN_MENTIONS: &str = r"@[a-zA-Z0-9_]+";

const PATTERN_HASHTAGS: &str = r"#[a-zA-Z0-9_]+";

/// The set of token patterns a [`TextCleaner`] strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanPatterns {
    pub links: bool,
    pub photos: bool,
    pub mentions: bool,
    pub hashtags: bool,
}

impl CleanPatterns {
    /// Everything, used for tweets.
    pub fn tweet() -> Self {
        Self {
            links: true,
            photos: true,
            mentions: true,
            hashtags: true,
        }
    }

    /// Links and usertags only, hashtags and photo links are kept in
    /// article paragraphs.
    pub fn article() -> Self {
        Self {
            links: true,
            photos: false,
            mentions: true,
            hashtags: false,
        }
    }

    /// Strip nothing but whitespace noise and non-ascii characters.
    pub fn none() -> Self {
        Self {
            links: false,
            photos: false,
            mentions: false,
            hashtags: false,
        }
    }

    fn regex(&self) -> Option<Regex> {
        let mut parts = Vec::with_capacity(4);
        if self.links {
            parts.push(PATTERN_LINKS);
        }
        if self.photos {
            parts.push(PATTERN_PHOTOS);
        }
        if self.mentions {
            parts.push(PATTERN_MENTIONS);
        }
        if self.hashtags {
            parts.push(PATTERN_HASHTAGS);
        }
        if parts.is_empty() {
            None
        } else {
            // the parts are fixed and known to compile
            Some(Regex::new(&parts.join("|")).unwrap())
        }
    }
}

impl Default for CleanPatterns {
    fn default() -> Self {
        CleanPatterns::tweet()
    }
}

/// Removes links, usertags, hashtags, emojis and extra whitespaces from text.
///
/// Numbers, punctuation marks and casing are kept. `clean` is idempotent:
/// cleaning already cleaned text returns it unchanged.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    patterns: CleanPatterns,
    re: Option<Regex>,
}

impl TextCleaner {
    pub fn new(patterns: CleanPatterns) -> Self {
        Self {
            re: patterns.regex(),
            patterns,
        }
    }

    #[inline]
    pub fn tweet() -> Self {
        TextCleaner::new(CleanPatterns::tweet())
    }

    #[inline]
    pub fn article() -> Self {
        TextCleaner::new(CleanPatterns::article())
    }

    pub fn patterns(&self) -> CleanPatterns {
        self.patterns
    }

    pub fn clean(&self, s: &str) -> String {
        // a pass can expose a new match, e.g. `pic@bob.x` or `#\u{e9}abc`
        let mut txt = self.clean_once(s);
        loop {
            let next = self.clean_once(&txt);
            if next == txt {
                return txt;
            }
            txt = next;
        }
    }

    /// Strips the patterns, collapses whitespace and drops non-ascii
    /// characters, in that order.
    fn clean_once(&self, s: &str) -> String {
        let txt = match &self.re {
            Some(re) => re.replace_all(s, ""),
            None => Cow::Borrowed(s),
        };
        let txt = RE_LINE_BREAKS.replace_all(&txt, " ");
        let txt = RE_SPACES.replace_all(&txt, " ");
        ascii_only(txt.trim())
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        TextCleaner::tweet()
    }
}

/// Drops every control or non-ascii character.
fn ascii_only(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Clean `s` with the given pattern set.
pub fn normalize(s: &str, patterns: CleanPatterns) -> String {
    if patterns == CleanPatterns::tweet() {
        TWEET_CLEANER.clean(s)
    } else if patterns == CleanPatterns::article() {
        ARTICLE_CLEANER.clean(s)
    } else {
        TextCleaner::new(patterns).clean(s)
    }
}

/// Clean a tweet body.
#[inline]
pub fn clean_tweet(s: &str) -> String {
    TWEET_CLEANER.clean(s)
}

/// Clean an article paragraph.
#[inline]
pub fn clean_article(s: &str) -> String {
    ARTICLE_CLEANER.clean(s)
}
