//! Fashion attribute lexicon
//!
//! Maps surface keywords ("검정", "오버사이즈", "티셔츠") to canonical
//! attribute values. When several keywords match, the longest one wins so
//! "비싼" resolves to 고급 rather than the 싼 it contains.

use once_cell::sync::Lazy;
use regex::Regex;

use stylist_core::{PriceTier, SearchFilters};

/// Canonical value and the keywords that select it
#[derive(Debug, Clone, Copy)]
pub struct LexiconEntry {
    pub canonical: &'static str,
    pub keywords: &'static [&'static str],
}

const fn entry(canonical: &'static str, keywords: &'static [&'static str]) -> LexiconEntry {
    LexiconEntry {
        canonical,
        keywords,
    }
}

pub const CATEGORIES: &[LexiconEntry] = &[
    entry(
        "상의",
        &["상의", "티셔츠", "셔츠", "니트", "후드", "맨투맨", "반팔", "긴팔", "블라우스", "탑"],
    ),
    entry("하의", &["하의", "바지", "청바지", "슬랙스", "트레이닝", "반바지", "팬츠"]),
    entry("신발", &["신발", "운동화", "스니커즈", "로퍼", "옥스포드"]),
    entry("아우터", &["아우터", "패딩", "코트", "자켓", "가디건"]),
    entry("패션소품", &["패션소품", "가방", "모자", "양말", "액세서리"]),
];

pub const STYLES: &[LexiconEntry] = &[
    entry("오버핏", &["오버핏", "오버사이즈", "빅사이즈", "루즈"]),
    entry("슬림핏", &["슬림핏", "슬림", "타이트", "꽉끼는"]),
    entry("베이직", &["베이직", "베이식", "기본", "심플", "무지"]),
    entry("스트릿", &["스트릿", "힙합", "힙한", "캐주얼"]),
    entry("빈티지", &["빈티지", "레트로", "올드"]),
    entry("꾸안꾸", &["꾸안꾸", "꾸민듯안꾸민듯", "자연스러운"]),
    entry("트렌디", &["트렌디", "유행", "인기", "핫한"]),
];

pub const COLORS: &[LexiconEntry] = &[
    entry("블랙", &["블랙", "검정", "검은"]),
    entry("화이트", &["화이트", "흰색", "흰"]),
    entry("네이비", &["네이비", "남색", "진한파랑"]),
    entry("그레이", &["그레이", "회색", "회"]),
    entry("베이지", &["베이지", "크림", "아이보리"]),
    entry("레드", &["레드", "빨간", "빨강"]),
    entry("블루", &["블루", "파란", "파랑"]),
];

pub const PRICE_RANGES: &[LexiconEntry] = &[
    entry("저렴", &["저렴", "싼", "가성비", "합리적"]),
    entry("보통", &["보통", "적당한", "중간"]),
    entry("고급", &["고급", "비싼", "프리미엄", "럭셔리"]),
];

/// "5만원 이하", "3 만 원 미만"
static PRICE_CEILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*만\s*원?\s*(이하|미만|아래|까지)").unwrap());

/// "29000원 이하"
static PRICE_CEILING_WON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4,})\s*원\s*(이하|미만|아래|까지)").unwrap());

/// Case-fold and collapse whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Substring match that tolerates missing spaces ("더보여" vs "더 보여")
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    if text.contains(keyword) {
        return true;
    }
    if !keyword.contains(' ') {
        return false;
    }
    let squeezed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let key: String = keyword.chars().filter(|c| !c.is_whitespace()).collect();
    squeezed.contains(&key)
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| contains_keyword(text, k))
}

/// Keyword tables for the four filterable attributes
#[derive(Debug, Clone, Copy)]
pub struct Lexicon {
    pub categories: &'static [LexiconEntry],
    pub styles: &'static [LexiconEntry],
    pub colors: &'static [LexiconEntry],
    pub price_ranges: &'static [LexiconEntry],
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            categories: CATEGORIES,
            styles: STYLES,
            colors: COLORS,
            price_ranges: PRICE_RANGES,
        }
    }
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_category(&self, text: &str) -> Option<&'static str> {
        longest_match(self.categories, text)
    }

    pub fn match_style(&self, text: &str) -> Option<&'static str> {
        longest_match(self.styles, text)
    }

    pub fn match_color(&self, text: &str) -> Option<&'static str> {
        longest_match(self.colors, text)
    }

    pub fn match_price_tier(&self, text: &str) -> Option<PriceTier> {
        longest_match(self.price_ranges, text).and_then(PriceTier::parse)
    }

    /// Explicit "N만원 이하" ceiling in KRW
    pub fn match_price_ceiling(&self, text: &str) -> Option<u32> {
        if let Some(caps) = PRICE_CEILING.captures(text) {
            let man: u32 = caps[1].parse().ok()?;
            let ceiling = man.checked_mul(10_000)?;
            return Some(exclusive_adjust(ceiling, &caps[2]));
        }
        let caps = PRICE_CEILING_WON.captures(text)?;
        let won: u32 = caps[1].parse().ok()?;
        Some(exclusive_adjust(won, &caps[2]))
    }

    /// Every attribute named in `text`
    pub fn extract_filters(&self, text: &str) -> SearchFilters {
        let text = normalize(text);
        let mut filters = SearchFilters::new();
        filters.category = self.match_category(&text).map(str::to_string);
        filters.style = self.match_style(&text).map(str::to_string);
        filters.color = self.match_color(&text).map(str::to_string);
        filters.max_price = self.match_price_ceiling(&text).filter(|p| *p > 0);
        if filters.max_price.is_none() {
            filters.price_range = self.match_price_tier(&text);
        }
        filters
    }

    /// Canonical style names in table order
    pub fn style_names(&self) -> impl Iterator<Item = &'static str> {
        self.styles.iter().map(|e| e.canonical)
    }

    /// Next style after `current` in table order, wrapping around
    pub fn style_after(&self, current: Option<&str>) -> Option<&'static str> {
        let names: Vec<&'static str> = self.style_names().collect();
        let first = names.first().copied()?;
        let Some(current) = current else {
            return Some(first);
        };
        match names.iter().position(|s| *s == current) {
            Some(i) => names.get((i + 1) % names.len()).copied(),
            None => Some(first),
        }
    }
}

fn exclusive_adjust(ceiling: u32, qualifier: &str) -> u32 {
    if qualifier == "미만" {
        ceiling.saturating_sub(1)
    } else {
        ceiling
    }
}

fn longest_match(table: &[LexiconEntry], text: &str) -> Option<&'static str> {
    let mut best: Option<(&'static str, usize)> = None;
    for e in table {
        for keyword in e.keywords {
            if !contains_keyword(text, keyword) {
                continue;
            }
            let len = keyword.chars().count();
            if best.map_or(true, |(_, l)| len > l) {
                best = Some((e.canonical, len));
            }
        }
    }
    best.map(|(canonical, _)| canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_style() {
        let lexicon = Lexicon::new();
        let filters = lexicon.extract_filters("스트릿 반팔 추천해줘");
        assert_eq!(filters.category.as_deref(), Some("상의"));
        assert_eq!(filters.style.as_deref(), Some("스트릿"));
        assert!(filters.color.is_none());
    }

    #[test]
    fn test_longest_keyword_wins() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.match_price_tier("비싼 코트"), Some(PriceTier::Premium));
        assert_eq!(lexicon.match_price_tier("싼 코트"), Some(PriceTier::Budget));
        // 청바지 and 바지 both map to 하의, 티셔츠 beats 셔츠
        assert_eq!(lexicon.match_category("청바지"), Some("하의"));
        assert_eq!(lexicon.match_category("흰 티셔츠"), Some("상의"));
    }

    #[test]
    fn test_price_ceiling() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.match_price_ceiling("5만원 이하"), Some(50_000));
        assert_eq!(lexicon.match_price_ceiling("3 만 원 미만"), Some(29_999));
        assert_eq!(lexicon.match_price_ceiling("25000원 까지"), Some(25_000));
        assert_eq!(lexicon.match_price_ceiling("반팔"), None);

        let filters = lexicon.extract_filters("저렴한 5만원 이하 니트");
        assert_eq!(filters.max_price, Some(50_000));
        assert!(filters.price_range.is_none());
    }

    #[test]
    fn test_keyword_spacing_tolerance() {
        assert!(contains_keyword("더보여줘", "더 보여"));
        assert!(contains_keyword("다른 것도 보여줘", "다른 것도"));
        assert!(!contains_keyword("보여줘", "더 보여"));
    }

    #[test]
    fn test_style_rotation() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.style_after(None), Some("오버핏"));
        assert_eq!(lexicon.style_after(Some("오버핏")), Some("슬림핏"));
        assert_eq!(lexicon.style_after(Some("트렌디")), Some("오버핏"));
        assert_eq!(lexicon.style_after(Some("unknown")), Some("오버핏"));
    }
}
