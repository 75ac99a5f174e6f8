#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Standard,
    Shuffle,
    Random,
}

/// Accepts the canonical tags as well as the original source's literal
/// Japanese trigger strings and legacy alias, so any caller still wired to
/// the old literals keeps working.
pub fn parse_trigger(raw: &str) -> Option<Trigger> {
    match raw {
        "standard" | "スタンダード" => Some(Trigger::Standard),
        "shuffle" | "シャッフル" | "類似画像検索" => Some(Trigger::Shuffle),
        "random" | "ランダム" => Some(Trigger::Random),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tags_parse() {
        assert_eq!(parse_trigger("standard"), Some(Trigger::Standard));
        assert_eq!(parse_trigger("shuffle"), Some(Trigger::Shuffle));
        assert_eq!(parse_trigger("random"), Some(Trigger::Random));
    }

    #[test]
    fn legacy_japanese_literals_parse() {
        assert_eq!(parse_trigger("スタンダード"), Some(Trigger::Standard));
        assert_eq!(parse_trigger("シャッフル"), Some(Trigger::Shuffle));
        assert_eq!(parse_trigger("ランダム"), Some(Trigger::Random));
    }

    #[test]
    fn legacy_alias_maps_to_shuffle() {
        assert_eq!(parse_trigger("類似画像検索"), Some(Trigger::Shuffle));
    }

    #[test]
    fn unknown_trigger_is_none() {
        assert_eq!(parse_trigger("bogus"), None);
    }
}
