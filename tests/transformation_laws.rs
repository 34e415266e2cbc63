//! Property tests for the transformation laws: identity, discard, constant
//! pass-through and idempotence.

use model_transform::{
    transform, AttributeValue, PathElement, ResourceInstance, ResourceSchema, TransformationBuilder,
    VersionedRuleSet,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

const ATTRIBUTES: [&str; 3] = ["a", "b", "secret"];

fn schema() -> ResourceSchema {
    let with_attributes = |schema: ResourceSchema| {
        ATTRIBUTES
            .iter()
            .fold(schema, |schema, name| schema.with_attribute(*name, true))
    };
    with_attributes(ResourceSchema::new(PathElement::literal("subsystem", "test")))
        .with_child(
            with_attributes(ResourceSchema::new(PathElement::wildcard("stack")))
                .with_child(with_attributes(ResourceSchema::new(PathElement::wildcard("channel")))),
        )
        .with_child(ResourceSchema::new(PathElement::literal("relay", "RELAY")))
}

fn empty_rules(schema: &ResourceSchema) -> VersionedRuleSet {
    TransformationBuilder::for_subsystem("test", schema).build()
}

/// Rules that only concern resources the generators never produce
fn unrelated_rules(schema: &ResourceSchema) -> VersionedRuleSet {
    let mut root = TransformationBuilder::for_subsystem("test", schema);
    root.reject_child_resource(PathElement::literal("relay", "RELAY")).unwrap();
    root.build()
}

fn discard_rules(schema: &ResourceSchema) -> VersionedRuleSet {
    let mut root = TransformationBuilder::for_subsystem("test", schema);
    root.discard_attributes(&["secret"]).unwrap();
    let stack = root.add_child_resource(PathElement::wildcard("stack")).unwrap();
    stack.discard_attributes(&["secret"]).unwrap();
    stack
        .add_child_resource(PathElement::wildcard("channel"))
        .unwrap()
        .discard_attributes(&["secret"])
        .unwrap();
    root.build()
}

fn expression_rules(schema: &ResourceSchema) -> VersionedRuleSet {
    let mut root = TransformationBuilder::for_subsystem("test", schema);
    root.reject_expressions(&["a", "b"]).unwrap();
    root.add_child_resource(PathElement::wildcard("stack"))
        .unwrap()
        .reject_nested_expressions(&["a", "b", "secret"])
        .unwrap()
        .discard_child_resource(PathElement::literal("channel", "drop"))
        .unwrap();
    root.build()
}

fn constant_strategy() -> BoxedStrategy<AttributeValue> {
    prop_oneof![
        any::<bool>().prop_map(|value| AttributeValue::constant(value)),
        any::<i64>().prop_map(|value| AttributeValue::constant(value)),
        "[a-z]{1,8}".prop_map(|value| AttributeValue::constant(value)),
    ]
    .boxed()
}

fn value_strategy() -> BoxedStrategy<AttributeValue> {
    prop_oneof![
        3 => constant_strategy(),
        1 => "[a-z.]{1,8}".prop_map(|name| AttributeValue::expression(format!("${{{}}}", name))),
    ]
    .boxed()
}

fn attributes_strategy(values: BoxedStrategy<AttributeValue>) -> impl Strategy<Value = BTreeMap<String, AttributeValue>> {
    prop::collection::btree_map(
        prop::sample::select(ATTRIBUTES.to_vec()).prop_map(|name| name.to_string()),
        values,
        0..=3,
    )
}

fn with_attributes(mut instance: ResourceInstance, attributes: BTreeMap<String, AttributeValue>) -> ResourceInstance {
    for (name, value) in attributes {
        instance.set_attribute(name, value);
    }
    instance
}

fn tree_strategy(values: BoxedStrategy<AttributeValue>) -> impl Strategy<Value = ResourceInstance> {
    let channel = ("[a-z]{1,5}", attributes_strategy(values.clone()))
        .prop_map(|(name, attributes)| with_attributes(ResourceInstance::new("channel", name), attributes));
    let stack = (
        "[a-z]{1,5}",
        attributes_strategy(values.clone()),
        prop::collection::vec(channel, 0..3),
    )
        .prop_map(|(name, attributes, channels)| {
            channels
                .into_iter()
                .fold(with_attributes(ResourceInstance::new("stack", name), attributes), |stack, channel| {
                    stack.with_child(channel)
                })
        });
    (attributes_strategy(values), prop::collection::vec(stack, 0..4)).prop_map(|(attributes, stacks)| {
        stacks
            .into_iter()
            .fold(with_attributes(ResourceInstance::new("subsystem", "test"), attributes), |root, stack| {
                root.with_child(stack)
            })
    })
}

fn assert_no_secret(instance: &ResourceInstance) {
    assert!(instance.attribute("secret").is_none(), "secret kept on {}", instance.element());
    instance.children().iter().for_each(assert_no_secret);
}

proptest! {
    /// Identity: with no applicable rule the output equals the input
    #[test]
    fn transform_without_matching_rules_is_identity(tree in tree_strategy(value_strategy())) {
        let schema = schema();
        prop_assert_eq!(&transform(&tree, &empty_rules(&schema)).unwrap(), &tree);
        prop_assert_eq!(&transform(&tree, &unrelated_rules(&schema)).unwrap(), &tree);
    }

    /// Discarded attributes never appear in the output, whatever their value
    #[test]
    fn discarded_attributes_never_survive(tree in tree_strategy(value_strategy())) {
        let schema = schema();
        let rules = discard_rules(&schema);
        let output = transform(&tree, &rules).unwrap();
        assert_no_secret(&output);
        prop_assert_eq!(output.size(), tree.size());

        // each stack transformed on its own matches its part of the whole tree
        for (stack, transformed) in tree.children().iter().zip(output.children()) {
            prop_assert_eq!(&transform(stack, &rules).unwrap(), transformed);
        }
    }

    /// Constants are always representable, so expression checks never fire on them
    #[test]
    fn constants_pass_expression_checks(tree in tree_strategy(constant_strategy())) {
        let schema = schema();
        let output = transform(&tree, &expression_rules(&schema)).unwrap();
        let dropped = PathElement::literal("channel", "drop");
        if tree.children().iter().any(|stack| stack.child(&dropped).is_some()) {
            prop_assert_eq!(output.attributes(), tree.attributes());
            for (stack, transformed) in tree.children().iter().zip(output.children()) {
                prop_assert_eq!(transformed.attributes(), stack.attributes());
                prop_assert!(transformed.child(&dropped).is_none());
            }
        } else {
            prop_assert_eq!(&output, &tree);
        }
    }

    /// Transforming an already transformed tree changes nothing
    #[test]
    fn transform_is_idempotent(tree in tree_strategy(value_strategy())) {
        let schema = schema();
        for rules in [discard_rules(&schema), expression_rules(&schema)] {
            if let Ok(once) = transform(&tree, &rules) {
                let twice = transform(&once, &rules).unwrap();
                prop_assert_eq!(twice, once);
            }
        }
    }
}
