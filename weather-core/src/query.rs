//! Splitting a spoken utterance into a place phrase and a time intent.
//!
//! Both halves are derived from the same raw text: the time words that decide
//! the [`TimeIntent`] are exactly the ones stripped from the place name.

use std::ops::Range;

use crate::model::Mode;

/// Relative-time phrases. Longer phrases come first so that "大后天" is not
/// eaten by "后天".
const TIME_WORDS: &[&str] = &[
    "大后天", "后天", "明天", "明日", "今天", "今日", "现在", "当前", "实时", "目前", "此刻",
    "最近几天", "这几天", "接下来", "最近", "未来", "本周", "这周", "下周", "周末", "几天",
];

const FORECAST_CUES: &[&str] =
    &["预报", "未来", "这几天", "接下来", "最近几天", "几天", "本周", "这周", "下周", "周末"];

const FILLER_WORDS: &[&str] = &[
    "天气预报", "天气情况", "天气状况", "天气", "预报", "气温", "温度", "怎么样", "怎样", "如何",
    "咋样", "多少度", "会下雨吗", "下雨吗", "查询", "查一下", "查查", "帮我", "帮忙", "请问",
    "告诉我", "看看", "一下", "情况", "请",
];

/// Particles that only matter at the edges of a phrase ("北京的", "上海呢").
const EDGE_PARTICLES: &[char] = &['的', '吗', '呢', '啊', '呀', '吧'];

const CJK_PUNCTUATION: &str = "，。？！、：；…“”‘’（）《》【】～·";

/// Time qualifier of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIntent {
    pub mode: Mode,
    /// Days after today the answer should start at (明天 = 1).
    pub offset_days: u8,
    /// Explicit number of days asked for; `None` means "use the configured default".
    pub days: Option<u8>,
}

impl TimeIntent {
    pub const fn current() -> Self {
        Self { mode: Mode::Current, offset_days: 0, days: None }
    }
}

/// Raw utterance as received from the host. Not guaranteed to name a real place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    raw: String,
}

impl LocationQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Place phrase with time words, filler and punctuation removed.
    /// Empty when nothing place-like is left.
    pub fn place_name(&self) -> String {
        place_name(&self.raw)
    }

    pub fn intent(&self) -> TimeIntent {
        let text = self.raw.as_str();
        let count = day_count(text).map(|(_, n)| n);

        let offset_days = if text.contains("大后天") {
            3
        } else if text.contains("后天") {
            2
        } else if text.contains("明天") || text.contains("明日") {
            1
        } else {
            0
        };

        if offset_days > 0 {
            return TimeIntent {
                mode: Mode::Forecast,
                offset_days,
                days: Some(count.unwrap_or(1)),
            };
        }

        let dated = calendar_date(text).is_some();
        if count.is_some() || dated || FORECAST_CUES.iter().any(|cue| text.contains(cue)) {
            return TimeIntent { mode: Mode::Forecast, offset_days: 0, days: count };
        }

        TimeIntent::current()
    }
}

/// Strips time qualifiers and conversational filler from `text`, returning the
/// first remaining segment.
pub fn place_name(text: &str) -> String {
    let mut cleaned = text.to_string();

    if let Some(range) = calendar_date(&cleaned) {
        cleaned.replace_range(range, " ");
    }
    if let Some((range, _)) = day_count(&cleaned) {
        cleaned.replace_range(range, " ");
    }
    for word in TIME_WORDS.iter().chain(FILLER_WORDS) {
        cleaned = cleaned.replace(word, " ");
    }

    cleaned
        .split(is_separator)
        .map(|segment| segment.trim_matches(|c: char| EDGE_PARTICLES.contains(&c)))
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_punctuation() || CJK_PUNCTUATION.contains(c)
}

/// Finds an "N天"/"N日" day count, returning its byte range and the value clamped to 1..=7.
fn day_count(text: &str) -> Option<(Range<usize>, u8)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c != '天' && c != '日' {
            continue;
        }

        let mut start = i;
        while start > 0 && is_numeral(chars[start - 1].1) {
            start -= 1;
        }
        // "10月20日" is a calendar date, not a count.
        if start == i || (start > 0 && chars[start - 1].1 == '月') {
            continue;
        }

        let numeral: String = chars[start..i].iter().map(|(_, c)| *c).collect();
        if let Some(n) = parse_numeral(&numeral) {
            let days = n.clamp(1, u32::from(crate::config::MAX_FORECAST_DAYS)) as u8;
            return Some((chars[start].0..pos + c.len_utf8(), days));
        }
    }

    None
}

/// Finds an "N月N日"/"N月N号" calendar date and returns its byte range.
fn calendar_date(text: &str) -> Option<Range<usize>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(_, c)) in chars.iter().enumerate() {
        if c != '月' {
            continue;
        }

        let mut start = i;
        while start > 0 && is_numeral(chars[start - 1].1) {
            start -= 1;
        }
        let mut end = i + 1;
        while end < chars.len() && is_numeral(chars[end].1) {
            end += 1;
        }

        if start == i || end == i + 1 {
            continue;
        }
        if let Some(&(pos, day)) = chars.get(end).filter(|(_, d)| *d == '日' || *d == '号') {
            return Some(chars[start].0..pos + day.len_utf8());
        }
    }

    None
}

fn is_numeral(c: char) -> bool {
    c.is_ascii_digit() || chinese_digit(c).is_some() || c == '十'
}

fn chinese_digit(c: char) -> Option<u32> {
    Some(match c {
        '零' => 0,
        '一' => 1,
        '二' | '两' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        _ => return None,
    })
}

fn single_chinese_digit(s: &str) -> Option<u32> {
    let mut chars = s.chars();
    let value = chinese_digit(chars.next()?)?;
    chars.next().is_none().then_some(value)
}

/// Arabic digits, or Chinese numerals up to 99.
fn parse_numeral(s: &str) -> Option<u32> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }

    match s.split_once('十') {
        None => single_chinese_digit(s),
        Some((tens, ones)) => {
            let tens = if tens.is_empty() { 1 } else { single_chinese_digit(tens)? };
            let ones = if ones.is_empty() { 0 } else { single_chinese_digit(ones)? };
            tens.checked_mul(10)?.checked_add(ones)
        }
    }
}
