/// Parse a short answer as a number: digit form first, then composable
/// English number words ("one hundred twenty three"). Any unrecognized word
/// aborts the parse — "banana" is not a number, not zero.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return Some(value);
        }
        return None;
    }

    parse_number_words(&trimmed)
}

fn parse_number_words(text: &str) -> Option<f64> {
    let mut total: i64 = 0;
    let mut current: i64 = 0;
    let mut seen_any = false;

    for token in text.split(|c: char| c.is_whitespace() || c == '-').filter(|t| !t.is_empty()) {
        seen_any = true;
        if let Some(unit) = unit_value(token) {
            current += unit;
        } else if let Some(tens) = tens_value(token) {
            current += tens;
        } else if token == "hundred" {
            current = current.max(1) * 100;
        } else if token == "thousand" {
            total += current.max(1) * 1000;
            current = 0;
        } else {
            return None;
        }
    }

    if !seen_any {
        return None;
    }

    Some((total + current) as f64)
}

fn unit_value(token: &str) -> Option<i64> {
    let value = match token {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        _ => return None,
    };
    Some(value)
}

fn tens_value(token: &str) -> Option<i64> {
    let value = match token {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_forms_parse() {
        assert_eq!(parse_number("5"), Some(5.0));
        assert_eq!(parse_number(" 3.25 "), Some(3.25));
        assert_eq!(parse_number("-12"), Some(-12.0));
    }

    #[test]
    fn simple_words_parse() {
        assert_eq!(parse_number("five"), Some(5.0));
        assert_eq!(parse_number("zero"), Some(0.0));
        assert_eq!(parse_number("nineteen"), Some(19.0));
        assert_eq!(parse_number("ninety"), Some(90.0));
    }

    #[test]
    fn composed_words_parse() {
        assert_eq!(parse_number("twenty three"), Some(23.0));
        assert_eq!(parse_number("twenty-three"), Some(23.0));
        assert_eq!(parse_number("one hundred twenty three"), Some(123.0));
        assert_eq!(parse_number("hundred"), Some(100.0));
        assert_eq!(parse_number("two thousand"), Some(2000.0));
        assert_eq!(parse_number("three thousand five hundred forty two"), Some(3542.0));
    }

    #[test]
    fn unrecognized_words_abort() {
        assert_eq!(parse_number("banana"), None);
        assert_eq!(parse_number("one banana"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("inf"), None);
    }
}
