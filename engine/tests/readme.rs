//! Tests that the README code samples are evaluated successfully.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use mathexpr::{Context, Symbols};

fn check_sample(code_sample: &str) {
    let context = Context::with_prelude();
    for line in code_sample.lines().filter(|line| !line.trim().is_empty()) {
        mathexpr::evaluate(&context, line, &Symbols::new())
            .unwrap_or_else(|err| panic!("failed evaluating `{line}`: {err}"));
    }
}

#[test]
fn code_samples_in_readme_are_evaluated() {
    const README: &str = include_str!("../README.md");

    let parser = Parser::new(README);
    let mut code: Option<String> = None;
    let mut checked_samples = 0;
    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang)))
                if lang.as_ref() == "text" =>
            {
                assert!(code.is_none(), "Embedded code samples");
                code = Some(String::with_capacity(1_024));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(code_sample) = code.take() {
                    assert!(!code_sample.is_empty());
                    check_sample(&code_sample);
                    checked_samples += 1;
                }
            }
            Event::Text(text) => {
                if let Some(code) = &mut code {
                    code.push_str(text.as_ref());
                }
            }
            _ => { /* Do nothing */ }
        }
    }
    assert!(checked_samples > 0);
}
