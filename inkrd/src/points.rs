//! Decoding of `trace` element bodies.
//!
//! A trace body is a comma-separated list of points; each point is a
//! whitespace-tolerant sequence of tokens, assigned positionally to the
//! channels of the trace format. Numeric tokens may carry a difference
//! marker that switches the channel into delta coding:
//!
//! - `!` selects explicit values,
//! - `'` selects first differences (deltas against the previous value),
//! - `"` selects second differences (deltas of deltas).
//!
//! A channel stays in the mode selected by the last marker it saw. `#`
//! introduces an uppercase hexadecimal literal, `T`/`F` are boolean
//! literals, `*` repeats the previous value and `?` skips an intermittent
//! channel for one point.

use crate::diag::DiagnosticSink;
use crate::ink::{ChannelType, IndexValue, TraceFormat};

/// Delta-coding mode of a regular channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DifferenceOrder {
    Explicit,
    FirstDifference,
    SecondDifference,
}

/// One lexed token of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// A numeric lexeme: optional difference marker, optional sign and a
    /// decimal or hexadecimal literal, possibly whitespace-separated.
    Number(&'a str),
    True,
    False,
    Wildcard,
    Placeholder,
}

/// Decoded samples of one regular channel, with the delta-coding carry
/// state used while decoding.
#[derive(Debug)]
pub(crate) struct RegularChannel {
    pub(crate) name: String,
    kind: ChannelType,
    pub(crate) values: Vec<f64>,
    order: DifferenceOrder,
    last_difference: f64,
}

impl RegularChannel {
    fn new(name: &str, kind: ChannelType) -> RegularChannel {
        RegularChannel {
            name: name.to_string(),
            kind,
            values: Vec::new(),
            order: DifferenceOrder::Explicit,
            last_difference: f64::NAN,
        }
    }
}

/// Decoded samples of one intermittent channel.
#[derive(Debug)]
pub(crate) struct IntermittentChannel {
    pub(crate) name: String,
    kind: ChannelType,
    pub(crate) samples: Vec<IndexValue>,
}

impl IntermittentChannel {
    fn new(name: &str, kind: ChannelType) -> IntermittentChannel {
        IntermittentChannel {
            name: name.to_string(),
            kind,
            samples: Vec::new(),
        }
    }
}

/// Decodes a trace body under the given format.
///
/// Returns `None` after reporting a warning if any point fails to decode;
/// the caller yields the trace without data in that case.
pub(crate) fn decode_trace_text(
    text: &str,
    format: &TraceFormat,
    sink: &mut dyn DiagnosticSink,
) -> Option<(Vec<RegularChannel>, Vec<IntermittentChannel>)> {
    let mut regular: Vec<RegularChannel> = format
        .regular_channels
        .iter()
        .map(|ch| RegularChannel::new(&ch.name, ch.kind))
        .collect();
    let mut intermittent: Vec<IntermittentChannel> = format
        .intermittent_channels
        .iter()
        .map(|ch| IntermittentChannel::new(&ch.name, ch.kind))
        .collect();

    let regular_count = regular.len();
    let channel_count = regular_count + intermittent.len();

    for (index, point) in text.split(',').enumerate() {
        let point = point.trim();
        let tokens = tokenize(point);

        if tokens.len() < regular_count || tokens.len() > channel_count {
            sink.warn(&format!(
                "Expected between {regular_count} and {channel_count} values for a point, \
                 but got {}: {point}",
                tokens.len()
            ));
            return None;
        }

        for (position, token) in tokens.iter().enumerate() {
            if position < regular_count {
                regular[position].push(*token, position, sink)?;
            } else {
                intermittent[position - regular_count].push(*token, position, index, sink)?;
            }
        }
    }

    Some((regular, intermittent))
}

impl RegularChannel {
    /// Decodes one token into this channel. `None` aborts the trace.
    fn push(
        &mut self,
        token: Token<'_>,
        position: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<()> {
        let fail = |sink: &mut dyn DiagnosticSink, text: &str| {
            sink.warn(&format!(
                "Unexpected value \"{text}\" in channel {position} (regular)"
            ));
            None
        };

        if token == Token::Wildcard {
            return match self.values.last() {
                Some(last) => {
                    let repeated = *last;
                    self.values.push(repeated);
                    Some(())
                }
                None => fail(sink, "*"),
            };
        }

        if self.kind == ChannelType::Boolean {
            return match token {
                Token::True => {
                    self.values.push(1.0);
                    Some(())
                }
                Token::False => {
                    self.values.push(0.0);
                    Some(())
                }
                Token::Number(text) => fail(sink, text),
                Token::Placeholder => fail(sink, "?"),
                Token::Wildcard => fail(sink, "*"),
            };
        }

        let text = match token {
            Token::Number(text) => text,
            Token::True => return fail(sink, "T"),
            Token::False => return fail(sink, "F"),
            Token::Placeholder => return fail(sink, "?"),
            Token::Wildcard => return fail(sink, "*"),
        };
        let Some((marker, num)) = parse_number(text) else {
            return fail(sink, text);
        };
        let order = marker.unwrap_or(self.order);

        let value = match order {
            DifferenceOrder::Explicit => {
                self.last_difference = f64::NAN;
                num
            }
            DifferenceOrder::FirstDifference => {
                let Some(last) = self.values.last() else {
                    return fail(sink, text);
                };
                let value = last + num;
                self.last_difference = num;
                value
            }
            DifferenceOrder::SecondDifference => {
                if !self.last_difference.is_finite() {
                    return fail(sink, text);
                }
                // self.values cannot be empty here: a finite carry implies
                // at least one first-difference value was pushed
                let last = self.values.last().copied().unwrap_or(0.0);
                let value = last + self.last_difference + num;
                self.last_difference += num;
                value
            }
        };

        self.order = order;
        self.values.push(self.rounded(value));
        Some(())
    }

    fn rounded(&self, value: f64) -> f64 {
        if self.kind == ChannelType::Integer {
            value.round()
        } else {
            value
        }
    }
}

impl IntermittentChannel {
    /// Decodes one token into this channel, anchored to point `index`.
    fn push(
        &mut self,
        token: Token<'_>,
        position: usize,
        index: usize,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<()> {
        let fail = |sink: &mut dyn DiagnosticSink, text: &str| {
            sink.warn(&format!(
                "Unexpected value \"{text}\" in channel {position} (intermittent)"
            ));
            None
        };

        match token {
            Token::Placeholder => Some(()),
            Token::Wildcard => match self.samples.last() {
                Some(last) => {
                    let value = last.value;
                    self.samples.push(IndexValue { index, value });
                    Some(())
                }
                None => fail(sink, "*"),
            },
            Token::True | Token::False if self.kind == ChannelType::Boolean => {
                let value = if token == Token::True { 1.0 } else { 0.0 };
                self.samples.push(IndexValue { index, value });
                Some(())
            }
            Token::True => fail(sink, "T"),
            Token::False => fail(sink, "F"),
            Token::Number(text) => {
                if self.kind == ChannelType::Boolean {
                    return fail(sink, text);
                }
                // Intermittent channels are never delta coded; a marker is
                // an error.
                let value = match parse_number(text) {
                    Some((None, num)) => num,
                    Some((Some(_), _)) | None => return fail(sink, text),
                };
                let value = if self.kind == ChannelType::Integer {
                    value.round()
                } else {
                    value
                };
                self.samples.push(IndexValue { index, value });
                Some(())
            }
        }
    }
}

/// Splits one point into tokens. Characters that start no token are
/// skipped.
fn tokenize(point: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = point.as_bytes();
    let mut at = 0;
    while at < bytes.len() {
        match bytes[at] {
            b'T' => {
                tokens.push(Token::True);
                at += 1;
            }
            b'F' => {
                tokens.push(Token::False);
                at += 1;
            }
            b'*' => {
                tokens.push(Token::Wildcard);
                at += 1;
            }
            b'?' => {
                tokens.push(Token::Placeholder);
                at += 1;
            }
            b if b.is_ascii_whitespace() => at += 1,
            _ => match number_len(&bytes[at..]) {
                Some(len) => {
                    tokens.push(Token::Number(&point[at..at + len]));
                    at += len;
                }
                None => at += 1,
            },
        }
    }
    tokens
}

/// Length of the numeric token at the start of `bytes`, if any.
///
/// Grammar: `[!'"]? ws* -? ws* ( '#' [0-9A-F]+ | digits ('.' digits?)? |
/// '.' digits ) ( [eE] [+-]? digits )?` with no exponent on hex literals.
fn number_len(bytes: &[u8]) -> Option<usize> {
    let mut at = 0;

    if matches!(bytes.first(), Some(b'!' | b'\'' | b'"')) {
        at += 1;
    }
    at += leading_spaces(&bytes[at..]);
    if bytes.get(at) == Some(&b'-') {
        at += 1;
        at += leading_spaces(&bytes[at..]);
    }

    if bytes.get(at) == Some(&b'#') {
        let digits = count_while(&bytes[at + 1..], |b| {
            b.is_ascii_digit() || (b'A'..=b'F').contains(&b)
        });
        return if digits > 0 { Some(at + 1 + digits) } else { None };
    }

    let whole = count_while(&bytes[at..], |b| b.is_ascii_digit());
    at += whole;
    let mut fraction = 0;
    if bytes.get(at) == Some(&b'.') {
        fraction = count_while(&bytes[at + 1..], |b| b.is_ascii_digit());
        if whole > 0 {
            // "1." is a complete literal, the fraction may be empty
            at += 1 + fraction;
        } else if fraction > 0 {
            at += 1 + fraction;
        }
    }
    if whole == 0 && fraction == 0 {
        return None;
    }

    if matches!(bytes.get(at), Some(b'e' | b'E')) {
        let mut exp = at + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let digits = count_while(&bytes[exp..], |b| b.is_ascii_digit());
        if digits > 0 {
            at = exp + digits;
        }
    }

    Some(at)
}

fn leading_spaces(bytes: &[u8]) -> usize {
    count_while(bytes, |b| b.is_ascii_whitespace())
}

fn count_while(bytes: &[u8], accept: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|b| accept(**b)).count()
}

/// Parses a numeric lexeme into its difference marker and value.
fn parse_number(text: &str) -> Option<(Option<DifferenceOrder>, f64)> {
    let (marker, rest) = match text.as_bytes().first() {
        Some(b'!') => (Some(DifferenceOrder::Explicit), &text[1..]),
        Some(b'\'') => (Some(DifferenceOrder::FirstDifference), &text[1..]),
        Some(b'"') => (Some(DifferenceOrder::SecondDifference), &text[1..]),
        Some(_) | None => (None, text),
    };

    let rest = rest.trim();
    let (negative, rest) = match rest.strip_prefix('-') {
        Some(tail) => (true, tail.trim()),
        None => (false, rest),
    };

    let magnitude = match rest.strip_prefix('#') {
        Some(hex) => u64::from_str_radix(hex, 16).ok().map(|v| v as f64)?,
        None => rest.parse::<f64>().ok()?,
    };

    let value = if negative { -magnitude } else { magnitude };
    Some((marker, value))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ink::Channel;
    use crate::testing::CollectSink;

    fn format(regular: &[(&str, ChannelType)], intermittent: &[(&str, ChannelType)]) -> TraceFormat {
        let channel = |(name, kind): &(&str, ChannelType)| {
            let mut channel = Channel::new(*name);
            channel.kind = *kind;
            channel
        };
        TraceFormat {
            id: String::new(),
            regular_channels: regular.iter().map(channel).collect(),
            intermittent_channels: intermittent.iter().map(channel).collect(),
        }
    }

    fn xy() -> TraceFormat {
        format(
            &[("X", ChannelType::Decimal), ("Y", ChannelType::Decimal)],
            &[],
        )
    }

    fn decode(text: &str, format: &TraceFormat) -> Option<Vec<Vec<f64>>> {
        let mut sink = CollectSink::default();
        let (regular, _) = decode_trace_text(text, format, &mut sink)?;
        Some(regular.into_iter().map(|ch| ch.values).collect())
    }

    #[test]
    fn tokenize_splits_points() {
        assert_eq!(
            tokenize("10 -3.5 T F * ?"),
            vec![
                Token::Number("10"),
                Token::Number("-3.5"),
                Token::True,
                Token::False,
                Token::Wildcard,
                Token::Placeholder,
            ]
        );
    }

    #[test]
    fn tokenize_markers_and_interior_whitespace() {
        assert_eq!(
            tokenize("'1 \"- 2 ! -  3"),
            vec![
                Token::Number("'1"),
                Token::Number("\"- 2"),
                Token::Number("! -  3"),
            ]
        );
    }

    #[test]
    fn tokenize_hex_and_exponent() {
        assert_eq!(
            tokenize("#A -#1F 1.5e3 2e-4 .5 7."),
            vec![
                Token::Number("#A"),
                Token::Number("-#1F"),
                Token::Number("1.5e3"),
                Token::Number("2e-4"),
                Token::Number(".5"),
                Token::Number("7."),
            ]
        );
        // lowercase hex digits terminate the literal
        assert_eq!(tokenize("#Aa"), vec![Token::Number("#A")]);
    }

    #[test]
    fn tokenize_skips_junk() {
        assert_eq!(
            tokenize("x10;20"),
            vec![Token::Number("10"), Token::Number("20")]
        );
        assert_eq!(tokenize("' x"), Vec::<Token<'_>>::new());
    }

    #[test]
    fn parse_number_forms() {
        assert_eq!(parse_number("10"), Some((None, 10.0)));
        assert_eq!(
            parse_number("'- 2"),
            Some((Some(DifferenceOrder::FirstDifference), -2.0))
        );
        assert_eq!(parse_number("#1F"), Some((None, 31.0)));
        assert_eq!(
            parse_number("\"#A"),
            Some((Some(DifferenceOrder::SecondDifference), 10.0))
        );
        assert_eq!(parse_number("-#A"), Some((None, -10.0)));
        assert_eq!(parse_number("1.5e2"), Some((None, 150.0)));
        assert_eq!(parse_number("#G"), None);
    }

    #[test]
    fn explicit_values_alternate_between_channels() {
        let values = decode("10 20, 11 22, 12 24", &xy()).expect("decoded");
        assert_eq!(values[0], [10.0, 11.0, 12.0]);
        assert_eq!(values[1], [20.0, 22.0, 24.0]);
    }

    #[test]
    fn first_difference_accumulates() {
        let values = decode("10 20, '1 '2, '1 '2", &xy()).expect("decoded");
        assert_eq!(values[0], [10.0, 11.0, 12.0]);
        assert_eq!(values[1], [20.0, 22.0, 24.0]);
    }

    #[test]
    fn second_difference_carries_the_first() {
        let values = decode("10 20, '1 '2, \"0 \"0", &xy()).expect("decoded");
        assert_eq!(values[0], [10.0, 11.0, 12.0]);
        assert_eq!(values[1], [20.0, 22.0, 24.0]);
    }

    #[test]
    fn marker_mode_is_sticky() {
        // the second point has no markers but the channel stays in
        // first-difference mode
        let values = decode("5, '2, 3", &format(&[("X", ChannelType::Decimal)], &[]))
            .expect("decoded");
        assert_eq!(values[0], [5.0, 7.0, 10.0]);
    }

    #[test]
    fn explicit_marker_resets_the_carry() {
        // "1 after !10 has no first difference to build on
        let mut sink = CollectSink::default();
        let format = format(&[("X", ChannelType::Decimal)], &[]);
        assert!(decode_trace_text("5, '1, !10, \"1", &format, &mut sink).is_none());
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn wildcard_and_hex() {
        let values = decode("#A 0, * #1F, * *", &xy()).expect("decoded");
        assert_eq!(values[0], [10.0, 10.0, 10.0]);
        assert_eq!(values[1], [0.0, 31.0, 31.0]);
    }

    #[test]
    fn wildcard_needs_a_previous_value() {
        let mut sink = CollectSink::default();
        assert!(decode_trace_text("* 0", &xy(), &mut sink).is_none());
        assert!(sink.warnings()[0].contains("channel 0 (regular)"));
    }

    #[test]
    fn integer_channels_round_half_away_from_zero() {
        let format = format(&[("X", ChannelType::Integer)], &[]);
        let values = decode("0, '0.5, '0.1, '-2.5", &format).expect("decoded");
        // each delta applies to the previous rounded value: 0+0.5 -> 1,
        // 1+0.1 -> 1, 1-2.5 -> -1.5 -> -2
        assert_eq!(values[0], [0.0, 1.0, 1.0, -2.0]);
    }

    #[test]
    fn boolean_channel_accepts_only_literals() {
        let format = format(
            &[("X", ChannelType::Decimal), ("P", ChannelType::Boolean)],
            &[],
        );
        let values = decode("0 T, 1 F, 2 *", &format).expect("decoded");
        assert_eq!(values[1], [1.0, 0.0, 0.0]);

        let mut sink = CollectSink::default();
        assert!(decode_trace_text("0 1", &format, &mut sink).is_none());
        assert!(sink.warnings()[0].contains("channel 1 (regular)"));
    }

    #[test]
    fn intermittent_placeholders_skip_points() {
        let format = format(
            &[("X", ChannelType::Decimal), ("Y", ChannelType::Decimal)],
            &[("F", ChannelType::Decimal)],
        );
        let mut sink = CollectSink::default();
        let (regular, intermittent) =
            decode_trace_text("0 0 1.0, 1 1 ?, 2 2 3.0", &format, &mut sink).expect("decoded");
        assert_eq!(regular[0].values, [0.0, 1.0, 2.0]);
        assert_eq!(regular[1].values, [0.0, 1.0, 2.0]);
        assert_eq!(
            intermittent[0].samples,
            [
                IndexValue { index: 0, value: 1.0 },
                IndexValue { index: 2, value: 3.0 },
            ]
        );
    }

    #[test]
    fn intermittent_tokens_may_be_omitted_entirely() {
        let format = format(
            &[("X", ChannelType::Decimal)],
            &[("F", ChannelType::Decimal)],
        );
        let mut sink = CollectSink::default();
        let (regular, intermittent) =
            decode_trace_text("0, 1 5, 2", &format, &mut sink).expect("decoded");
        assert_eq!(regular[0].values, [0.0, 1.0, 2.0]);
        assert_eq!(
            intermittent[0].samples,
            [IndexValue { index: 1, value: 5.0 }]
        );
    }

    #[test]
    fn intermittent_rejects_difference_markers() {
        let format = format(
            &[("X", ChannelType::Decimal)],
            &[("F", ChannelType::Decimal)],
        );
        let mut sink = CollectSink::default();
        assert!(decode_trace_text("0 '5", &format, &mut sink).is_none());
        assert!(sink.warnings()[0].contains("channel 1 (intermittent)"));
    }

    #[test]
    fn cardinality_is_checked_per_point() {
        let mut sink = CollectSink::default();
        assert!(decode_trace_text("10 20, 11", &xy(), &mut sink).is_none());
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Expected between 2 and 2"));
    }

    #[test]
    fn empty_format_accepts_nothing() {
        let empty = format(&[], &[]);
        let mut sink = CollectSink::default();
        assert!(decode_trace_text("1", &empty, &mut sink).is_none());
    }
}
