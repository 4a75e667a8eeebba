/// Structured fields of a shirt classifier label.
///
/// Labels follow `name-orientation[-year][-otherdata...]`, e.g.
/// `Yankees-Home-1998-Jersey`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLabel {
    pub name: String,
    pub orientation: Option<String>,
    pub year: Option<String>,
    pub other_data: Option<String>,
}

/// Split a raw classifier label into its fields.
///
/// Never fails: a label without a `-` comes back as a bare name.
pub fn parse_label(raw: &str) -> ParsedLabel {
    let parts: Vec<&str> = raw.split('-').collect();

    if parts.len() < 2 {
        return ParsedLabel {
            name: raw.to_string(),
            ..Default::default()
        };
    }

    let year = parts
        .get(2)
        .filter(|part| is_year(part))
        .map(|part| part.to_string());

    let rest_start = if year.is_some() { 3 } else { 2 };
    let other_data = if parts.len() > rest_start {
        Some(parts[rest_start..].join("-"))
    } else {
        None
    };

    ParsedLabel {
        name: parts[0].to_string(),
        orientation: Some(parts[1].to_string()),
        year,
        other_data,
    }
}

fn is_year(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_has_no_other_fields() {
        for raw in ["Dodgers", "", "1943", "Red Sox"] {
            let parsed = parse_label(raw);
            assert_eq!(parsed.name, raw);
            assert_eq!(parsed.orientation, None);
            assert_eq!(parsed.year, None);
            assert_eq!(parsed.other_data, None);
        }
    }

    #[test]
    fn full_label() {
        let parsed = parse_label("Yankees-Home-1998-Jersey");
        assert_eq!(parsed.name, "Yankees");
        assert_eq!(parsed.orientation.as_deref(), Some("Home"));
        assert_eq!(parsed.year.as_deref(), Some("1998"));
        assert_eq!(parsed.other_data.as_deref(), Some("Jersey"));
    }

    #[test]
    fn non_numeric_third_part_goes_to_other_data() {
        let parsed = parse_label("A-B-notdigits");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.other_data.as_deref(), Some("notdigits"));

        let parsed = parse_label("A-B-notdigits-more-stuff");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.other_data.as_deref(), Some("notdigits-more-stuff"));
    }

    #[test]
    fn year_without_remainder() {
        let parsed = parse_label("Lions-Away-2001");
        assert_eq!(parsed.year.as_deref(), Some("2001"));
        assert_eq!(parsed.other_data, None);
    }

    #[test]
    fn extra_parts_are_rejoined() {
        let parsed = parse_label("A-B-1999-extra-long-tail");
        assert_eq!(parsed.name, "A");
        assert_eq!(parsed.orientation.as_deref(), Some("B"));
        assert_eq!(parsed.year.as_deref(), Some("1999"));
        assert_eq!(parsed.other_data.as_deref(), Some("extra-long-tail"));
    }

    #[test]
    fn two_parts_only() {
        let parsed = parse_label("Celtics-Front");
        assert_eq!(parsed.name, "Celtics");
        assert_eq!(parsed.orientation.as_deref(), Some("Front"));
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.other_data, None);
    }

    #[test]
    fn non_ascii_digits_are_not_a_year() {
        // Arabic-Indic digits
        let parsed = parse_label("A-B-١٩٩٩");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.other_data.as_deref(), Some("١٩٩٩"));
    }

    #[test]
    fn empty_third_part_is_not_a_year() {
        let parsed = parse_label("A-B--x");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.other_data.as_deref(), Some("-x"));
    }
}
