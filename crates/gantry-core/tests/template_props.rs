//! Property tests for template substitution

use gantry_core::{HttpMethod, Params, RequestTemplate};
use proptest::prelude::*;

const BASE: &str = "https://api.example.com/v1";

fn params(max: usize) -> impl Strategy<Value = Params> {
    proptest::collection::vec(
        ("[a-z]{1,8}", proptest::option::of("[a-z0-9]{0,8}")),
        0..max,
    )
}

fn template_from(path_defaults: &Params, query_defaults: &Params) -> RequestTemplate {
    let mut template = RequestTemplate::new(BASE, HttpMethod::Get).unwrap();
    for (name, value) in path_defaults {
        template = template.with_path_default(name, value.as_deref());
    }
    for (name, value) in query_defaults {
        template = template.with_query_default(name, value.as_deref());
    }
    template
}

proptest! {
    #[test]
    fn substitution_is_idempotent(
        path_defaults in params(4),
        query_defaults in params(4),
        overrides in params(4),
    ) {
        let template = template_from(&path_defaults, &query_defaults);
        let first = template.substitute(&overrides, &overrides, None);
        let second = template.substitute(&overrides, &overrides, None);
        prop_assert_eq!(&first.url, &second.url);
    }

    #[test]
    fn substitution_does_not_mutate_the_template(
        path_defaults in params(4),
        query_defaults in params(4),
        overrides in params(4),
    ) {
        let template = template_from(&path_defaults, &query_defaults);
        let before = template.substitute(&vec![], &vec![], None);
        let _ = template.substitute(&overrides, &overrides, None);
        let after = template.substitute(&vec![], &vec![], None);
        prop_assert_eq!(&before.url, &after.url);
    }

    #[test]
    fn query_prefix_appears_only_with_rendered_entries(
        query_defaults in params(4),
    ) {
        let template = template_from(&vec![], &query_defaults);
        let request = template.substitute(&vec![], &vec![], None);
        let has_rendered_entry = query_defaults.iter().any(|(_, value)| value.is_some());
        prop_assert_eq!(request.url.contains('?'), has_rendered_entry);
    }

    #[test]
    fn overridden_query_values_render_in_the_url(
        name in "[a-z]{1,8}",
        default_value in "[a-z0-9]{1,8}",
        override_value in "[a-z0-9]{1,8}",
    ) {
        let defaults = vec![(name.clone(), Some(default_value))];
        let template = template_from(&vec![], &defaults);
        let overrides = vec![(name.clone(), Some(override_value.clone()))];
        let request = template.substitute(&vec![], &overrides, None);
        let expected = format!("{}={}", name, override_value);
        prop_assert!(request.url.contains(&expected));
    }
}
