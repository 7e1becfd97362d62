use chatterbox_commands::*;
use chatterbox_permissions::Caller;
use proptest::prelude::*;
use std::collections::HashMap;

/// Strategy for tokens that need no quoting
fn plain_token() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.\\-]{1,12}"
}

/// Strategy for tokens that may contain spaces and quotes
fn quotable_token() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \"]{0,12}"
}

fn quote(token: &str) -> String {
    format!("\"{}\"", token.replace('"', "\\\""))
}

// **Feature: chat-dispatch, Property 1: Plain tokens survive whitespace splitting**
proptest! {
    #[test]
    fn prop_plain_tokens_round_trip(
        tokens in prop::collection::vec(plain_token(), 0..8),
        gap in "[ \t]{1,3}",
    ) {
        let message = format!("  {}  ", tokens.join(&gap));
        prop_assert_eq!(tokenize(&message), tokens);
    }
}

// **Feature: chat-dispatch, Property 2: Quoting with escaped quotes preserves any token**
proptest! {
    #[test]
    fn prop_quoted_tokens_round_trip(tokens in prop::collection::vec(quotable_token(), 1..6)) {
        let message = tokens.iter().map(|token| quote(token)).collect::<Vec<_>>().join(" ");
        prop_assert_eq!(tokenize(&message), tokens);
    }
}

// **Feature: chat-dispatch, Property 3: Tokenizing never panics**
proptest! {
    #[test]
    fn prop_tokenize_total(message in ".{0,64}") {
        let tokens = tokenize(&message);
        prop_assert!(tokens.len() <= message.len());
    }
}

// **Feature: chat-dispatch, Property 4: Integer binding accepts exactly the i64 tokens**
proptest! {
    #[test]
    fn prop_integer_binding(value in any::<i64>(), junk in "[a-z]{1,4}") {
        let signatures = vec![Signature::integer("count", |_, _| Ok(CommandOutput::empty()))];
        let caller = Caller::new("1", "Ann");

        let binding = ArgumentBinder::bind(&signatures, &[value.to_string()], &caller).unwrap();
        prop_assert_eq!(binding.args.integer("count").unwrap(), value);

        let error = ArgumentBinder::bind(&signatures, &[format!("{}{}", value, junk)], &caller)
            .unwrap_err();
        let is_type_error = matches!(error, BindError::Type { .. });
        prop_assert!(is_type_error);
    }
}

// **Feature: chat-dispatch, Property 5: Token counts outside the range are syntax errors**
proptest! {
    #[test]
    fn prop_count_outside_range_is_syntax_error(count in 0usize..8) {
        let signature = Signature::from_fn(
            vec![Param::text("a"), Param::text("b"), Param::text("c").with_default("x")],
            |_| Ok(CommandOutput::empty()),
        );
        let tokens: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        let result = ArgumentBinder::bind(std::slice::from_ref(&signature), &tokens, &Caller::new("1", "Ann"));

        if (2..=3).contains(&count) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), BindError::Syntax { supplied: count });
        }
    }
}

// **Feature: chat-dispatch, Property 6: Compact output is the in-order concatenation of records**
proptest! {
    #[test]
    fn prop_compact_concatenation(items in prop::collection::vec(("[a-z]{1,8}", any::<u32>()), 0..10)) {
        let expected: String = items.iter().map(|(name, id)| format!("{}|{};", name, id)).collect();
        let collection = CompactCollection::new(
            items.clone(),
            |(name, _): &(String, u32)| name.clone(),
            |(name, id): &(String, u32)| format!("{}|{};", name, id),
        );
        let output = CommandOutput::collection(collection);
        let lines = output.render(RenderMode::Compact);

        if items.is_empty() {
            prop_assert!(lines.is_empty());
        } else {
            prop_assert_eq!(lines, vec![expected.clone()]);
            prop_assert_eq!(parse_records(&expected).len(), items.len());
        }
    }
}

// **Feature: chat-dispatch, Property 6b: Compact records preserve arbitrary field values**
proptest! {
    #[test]
    fn prop_field_records_are_lossless(
        records in prop::collection::vec(prop::collection::vec(".{0,12}", 1..5), 0..6)
    ) {
        let compact: String = records.iter().map(|fields| format_record(fields.as_slice())).collect();
        prop_assert_eq!(parse_records(&compact), records);
    }
}

// **Feature: chat-dispatch, Property 7: Template substitution is idempotent**
proptest! {
    #[test]
    fn prop_template_substitution_idempotence(
        var_name in "[a-z_][a-z0-9_]{0,10}",
        var_value in "[a-zA-Z0-9 ]{1,20}",
    ) {
        let template = format!("Hello {{{{{}}}}} world", var_name);
        let mut vars = HashMap::new();
        vars.insert(var_name, var_value.clone());

        let first = TemplateProcessor::process(&template, &vars).unwrap();
        let second = TemplateProcessor::process(&first, &vars).unwrap();
        prop_assert_eq!(&first, &format!("Hello {} world", var_value));
        prop_assert_eq!(first, second);
    }
}
