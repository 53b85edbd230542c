use crate::theme::ResolvedTheme;
use eframe::egui::text::{LayoutJob, TextFormat};
use eframe::egui::{Color32, FontId, TextStyle, Ui};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
    Italic(String),
    Code(String),
    CodeBlock(String),
}

pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("```") else {
            break;
        };
        parse_inline(&rest[..start], &mut spans);
        spans.push(Span::CodeBlock(after[..end].trim().to_string()));
        rest = &after[end + 3..];
    }
    parse_inline(rest, &mut spans);
    spans
}

fn parse_inline(text: &str, spans: &mut Vec<Span>) {
    let mut plain = String::new();
    let mut rest = text;
    while !rest.is_empty() {
        let matched = [("**", Span::Bold as fn(String) -> Span), ("`", Span::Code), ("*", Span::Italic)]
            .into_iter()
            .find_map(|(marker, make)| {
                let body = rest.strip_prefix(marker)?;
                let end = body.find(marker)?;
                if end == 0 {
                    return None;
                }
                Some((make(body[..end].to_string()), marker.len() * 2 + end))
            });
        match matched {
            Some((span, consumed)) => {
                if !plain.is_empty() {
                    spans.push(Span::Plain(std::mem::take(&mut plain)));
                }
                spans.push(span);
                rest = &rest[consumed..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(ch) = chars.next() {
                    plain.push(ch);
                }
                rest = chars.as_str();
            }
        }
    }
    if !plain.is_empty() {
        spans.push(Span::Plain(plain));
    }
}

pub fn render(ui: &mut Ui, text: &str, color: Color32, theme: &ResolvedTheme) {
    let body = TextStyle::Body.resolve(ui.style());
    let mono = FontId::monospace(body.size - 1.0);
    let code_bg = theme.neutral.gamma_multiply(0.35);
    let plain = TextFormat {
        font_id: body.clone(),
        color,
        ..Default::default()
    };

    let mut job = LayoutJob::default();
    for span in parse_spans(text) {
        match span {
            Span::Plain(text) => job.append(&text, 0.0, plain.clone()),
            Span::Bold(text) => job.append(
                &text,
                0.0,
                TextFormat {
                    font_id: FontId::new(body.size + 0.5, body.family.clone()),
                    color: ui.visuals().strong_text_color().lerp_to_gamma(color, 0.3),
                    ..plain.clone()
                },
            ),
            Span::Italic(text) => job.append(
                &text,
                0.0,
                TextFormat {
                    italics: true,
                    ..plain.clone()
                },
            ),
            Span::Code(text) => job.append(
                &text,
                0.0,
                TextFormat {
                    font_id: mono.clone(),
                    background: code_bg,
                    ..plain.clone()
                },
            ),
            Span::CodeBlock(text) => {
                if !job.text.is_empty() && !job.text.ends_with('\n') {
                    job.append("\n", 0.0, plain.clone());
                }
                job.append(
                    &format!("{text}\n"),
                    0.0,
                    TextFormat {
                        font_id: mono.clone(),
                        background: code_bg,
                        ..plain.clone()
                    },
                );
            }
        }
    }
    ui.label(job);
}

#[cfg(test)]
mod tests {
    use super::{parse_spans, Span};

    #[test]
    fn inline_markers_are_recognized() {
        let spans = parse_spans("a **b** *c* `d` e");
        assert_eq!(
            spans,
            vec![
                Span::Plain("a ".to_string()),
                Span::Bold("b".to_string()),
                Span::Plain(" ".to_string()),
                Span::Italic("c".to_string()),
                Span::Plain(" ".to_string()),
                Span::Code("d".to_string()),
                Span::Plain(" e".to_string()),
            ]
        );
    }

    #[test]
    fn fenced_block_is_trimmed() {
        let spans = parse_spans("see:\n```\nfn main() {}\n```\ndone");
        assert_eq!(
            spans,
            vec![
                Span::Plain("see:\n".to_string()),
                Span::CodeBlock("fn main() {}".to_string()),
                Span::Plain("\ndone".to_string()),
            ]
        );
    }

    #[test]
    fn unmatched_markers_stay_plain() {
        assert_eq!(
            parse_spans("2 * 3 and ``` open"),
            vec![Span::Plain("2 * 3 and ``` open".to_string())]
        );
        assert_eq!(parse_spans("**"), vec![Span::Plain("**".to_string())]);
    }
}
