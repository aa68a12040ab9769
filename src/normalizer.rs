const REGIONAL_INDICATORS: std::ops::RangeInclusive<char> = '\u{1F1E6}'..='\u{1F1FF}';
const CJK_IDEOGRAPHS: std::ops::RangeInclusive<char> = '\u{4E00}'..='\u{9FFF}';

const HK: &str = "🇭🇰 香港";
const TW: &str = "🇹🇼 台湾";
const JP: &str = "🇯🇵 日本";
const KR: &str = "🇰🇷 韩国";
const SG: &str = "🇸🇬 新加坡";
const US: &str = "🇺🇸 美国";
const CA: &str = "🇨🇦 加拿大";
const UK: &str = "🇬🇧 英国";
const DE: &str = "🇩🇪 德国";
const FR: &str = "🇫🇷 法国";
const NL: &str = "🇳🇱 荷兰";
const RU: &str = "🇷🇺 俄罗斯";
const TR: &str = "🇹🇷 土耳其";
const IN: &str = "🇮🇳 印度";
const AU: &str = "🇦🇺 澳大利亚";

/**
 * Region tokens in match order, first hit wins.
 * Chinese names, then English names, then abbreviations, so that a
 * full name like `australia` is seen before the `us` inside it.
 */
pub const REGION_TABLE: &[(&str, &str)] = &[
    ("香港", HK),
    ("台湾", TW),
    ("日本", JP),
    ("韩国", KR),
    ("新加坡", SG),
    ("美国", US),
    ("加拿大", CA),
    ("英国", UK),
    ("德国", DE),
    ("法国", FR),
    ("荷兰", NL),
    ("俄罗斯", RU),
    ("土耳其", TR),
    ("印度", IN),
    ("澳大利亚", AU),
    ("hong kong", HK),
    ("taiwan", TW),
    ("japan", JP),
    ("korea", KR),
    ("singapore", SG),
    ("united states", US),
    ("canada", CA),
    ("united kingdom", UK),
    ("germany", DE),
    ("france", FR),
    ("netherlands", NL),
    ("russia", RU),
    ("turkey", TR),
    ("india", IN),
    ("australia", AU),
    ("hk", HK),
    ("tw", TW),
    ("jp", JP),
    ("kr", KR),
    ("sg", SG),
    ("usa", US),
    ("us", US),
    ("ca", CA),
    ("uk", UK),
    ("de", DE),
    ("fr", FR),
    ("nl", NL),
    ("ru", RU),
    ("tr", TR),
    ("in", IN),
    ("au", AU),
];

/// Cleans node names and prefixes them with a flag and region.
#[derive(Debug, Clone, Copy)]
pub struct NameNormalizer {
    table: &'static [(&'static str, &'static str)],
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self {
            table: REGION_TABLE,
        }
    }
}

impl NameNormalizer {
    pub fn normalize(&self, name: &str) -> String {
        let cleaned: String = name.chars().filter(|c| is_kept(*c)).collect();

        let tagged = match self.region(&cleaned) {
            Some(tag) if !starts_with_flag(&cleaned) => format!("{} {}", tag, cleaned.trim()),
            _ => cleaned,
        };
        tagged.trim().to_owned()
    }

    /// The canonical tag of the first table entry found in `name`.
    pub fn region(&self, name: &str) -> Option<&'static str> {
        let lower = name.to_lowercase();
        self.table
            .iter()
            .find(|(token, _)| lower.contains(token))
            .map(|(_, tag)| *tag)
    }
}

fn is_kept(c: char) -> bool {
    c.is_alphanumeric()
        || c == '_'
        || c == '-'
        || c.is_whitespace()
        || CJK_IDEOGRAPHS.contains(&c)
        || REGIONAL_INDICATORS.contains(&c)
}

pub fn starts_with_flag(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| REGIONAL_INDICATORS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(name: &str) -> String {
        NameNormalizer::default().normalize(name)
    }

    #[test]
    fn tags_chinese_and_english_names() {
        assert_eq!(normalize("香港 01"), "🇭🇰 香港 香港 01");
        assert_eq!(normalize("Japan Tokyo 02"), "🇯🇵 日本 Japan Tokyo 02");
        assert_eq!(normalize("SG-Premium"), "🇸🇬 新加坡 SG-Premium");
    }

    #[test]
    fn strips_disallowed_characters() {
        assert_eq!(normalize("★ 节点 | 01 ★"), "节点  01");
        assert_eq!(normalize("foo.bar@baz"), "foobarbaz");
        assert_eq!(normalize("♻️"), "");
    }

    #[test]
    fn never_retags_a_flagged_name() {
        assert_eq!(normalize("🇭🇰 HK 01"), "🇭🇰 HK 01");
        let once = normalize("Hong Kong 01");
        assert_eq!(once, "🇭🇰 香港 Hong Kong 01");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(normalize("hk-uk relay"), "🇭🇰 香港 hk-uk relay");
        assert_eq!(normalize("Australia 01"), "🇦🇺 澳大利亚 Australia 01");
        assert_eq!(normalize("Russia"), "🇷🇺 俄罗斯 Russia");
        assert_eq!(normalize("香港 Japan"), "🇭🇰 香港 香港 Japan");
    }

    #[test]
    fn unmatched_names_are_only_cleaned() {
        assert_eq!(normalize("  relay-7  "), "relay-7");
    }

    #[test]
    fn deterministic() {
        for name in ["美国 West", "random", "UK London 🚀", "台湾"] {
            assert_eq!(normalize(name), normalize(name));
        }
    }
}
