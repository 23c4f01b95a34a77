//! Static markup serializer.
//!
//! Walks a [`Node`] tree and produces an HTML-like string. Serialization is
//! total: a failing component only blanks its own subtree.

use crate::attributes::{inner_html, render_attributes};
use crate::node::{Element, Invocation, Node, RenderError};

/// Tags that never carry children and always self-close.
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether `tag` is a void element (case-insensitive).
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Serialize a node tree to markup.
///
/// Never fails. Components that error or panic are logged and rendered as
/// empty, leaving their siblings and ancestors intact.
pub fn serialize(node: &Node) -> String {
    let mut output = String::new();
    write_node(node, &mut output);
    output
}

/// Serialize an invocation, surfacing a failure of the component itself.
///
/// Failures further down the tree are still contained as in [`serialize`].
pub fn serialize_strict(invocation: &Invocation) -> Result<String, RenderError> {
    let rendered = invocation.call()?;
    Ok(serialize(&rendered))
}

/// Expand every invocation in the tree, leaving only host nodes.
///
/// Failing components become [`Node::Empty`], exactly as in [`serialize`], so
/// `serialize(&expand(node)) == serialize(node)`.
pub fn expand(node: &Node) -> Node {
    match node {
        Node::Sequence(nodes) => Node::Sequence(nodes.iter().map(expand).collect()),
        Node::Fragment(children) => Node::Fragment(Box::new(expand(children))),
        Node::Element(element) => {
            Node::Element(element.with_child_nodes(element.child_nodes().iter().map(expand).collect()))
        }
        Node::Invocation(invocation) => call_contained(invocation)
            .map(|rendered| expand(&rendered))
            .unwrap_or_default(),
        other => other.clone(),
    }
}

/// Expand an invocation, surfacing a failure of the component itself.
pub fn expand_strict(invocation: &Invocation) -> Result<Node, RenderError> {
    let rendered = invocation.call()?;
    Ok(expand(&rendered))
}

fn call_contained(invocation: &Invocation) -> Option<Node> {
    match invocation.call() {
        Ok(rendered) => Some(rendered),
        Err(e) => {
            tracing::warn!(
                "Failed to render component {}: {}",
                invocation.component().label(),
                e
            );
            None
        }
    }
}

fn write_node(node: &Node, output: &mut String) {
    match node {
        Node::Empty => {}
        Node::Text(text) => output.push_str(text),
        Node::Sequence(nodes) => {
            for node in nodes {
                write_node(node, output);
            }
        }
        Node::Fragment(children) => write_node(children, output),
        Node::Invocation(invocation) => {
            if let Some(rendered) = call_contained(invocation) {
                write_node(&rendered, output);
            }
        }
        Node::Element(element) => write_element(element, output),
        Node::Opaque(opaque) => {
            if let Some(text) = opaque.coerce() {
                output.push_str(&text);
            }
        }
    }
}

fn write_element(element: &Element, output: &mut String) {
    let tag = element.tag();

    output.push('<');
    output.push_str(tag);
    output.push_str(&render_attributes(element.attributes()));

    if is_void_element(tag) {
        output.push_str(" />");
        return;
    }

    output.push('>');
    match inner_html(element.attributes()) {
        Some(html) => output.push_str(&html),
        None => {
            for child in element.child_nodes() {
                write_node(child, output);
            }
        }
    }
    output.push_str("</");
    output.push_str(tag);
    output.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{INNER_HTML_FIELD, INNER_HTML_KEY};
    use crate::node::FnComponent;
    use crate::value::{Callback, Props, Value};
    use pretty_assertions::assert_eq;
    use std::fmt;

    #[test]
    fn empty_values_render_nothing() {
        assert_eq!(serialize(&Node::Empty), "");
        assert_eq!(serialize(&Node::from(true)), "");
        assert_eq!(serialize(&Node::from(false)), "");
        assert_eq!(serialize(&Node::classify(Value::Null)), "");
        assert_eq!(serialize(&Node::from(None::<String>)), "");
    }

    #[test]
    fn text_and_numbers_render_verbatim() {
        assert_eq!(serialize(&Node::from("a < b")), "a < b");
        assert_eq!(serialize(&Node::from(42)), "42");
        assert_eq!(serialize(&Node::from(-3.25)), "-3.25");
    }

    #[test]
    fn sequences_preserve_order() {
        let items: Vec<Node> = vec!["one".into(), 2.into(), Node::Empty, "three".into()];
        let expected: String = items.iter().map(serialize).collect();

        assert_eq!(serialize(&Node::Sequence(items)), expected);
        assert_eq!(expected, "one2three");
    }

    #[test]
    fn fragments_add_no_wrapper() {
        let node = Node::fragment([Node::from(Element::new("i").child("a")), Node::from("b")]);
        assert_eq!(serialize(&node), "<i>a</i>b");
    }

    #[test]
    fn void_elements_self_close() {
        for tag in VOID_ELEMENTS {
            assert_eq!(serialize(&Element::new(tag).into()), format!("<{} />", tag));
        }
    }

    #[test]
    fn void_match_ignores_case_and_drops_children() {
        let node: Node = Element::new("BR").child("ignored").into();
        assert_eq!(serialize(&node), "<BR />");

        let img: Node = Element::new("img").attr("src", "/a.png").into();
        assert_eq!(serialize(&img), r#"<img src="/a.png" />"#);
    }

    #[test]
    fn elements_wrap_children() {
        let node: Node = Element::new("p").child("hi").into();
        assert_eq!(serialize(&node), "<p>hi</p>");
    }

    #[test]
    fn inner_html_replaces_children() {
        let node: Node = Element::new("div")
            .attr(INNER_HTML_KEY, Props::new().with(INNER_HTML_FIELD, "<em>raw</em>"))
            .child("ignored")
            .into();

        assert_eq!(serialize(&node), "<div><em>raw</em></div>");
    }

    #[test]
    fn handlers_never_reach_markup() {
        let node: Node = Element::new("button")
            .attr("onClick", Callback::new(|_| {}))
            .attr("className", "btn")
            .child("Go")
            .into();

        let markup = serialize(&node);

        assert_eq!(markup, r#"<button class="btn">Go</button>"#);
        assert!(!markup.contains("onClick"));
    }

    #[test]
    fn invocations_render_with_props() {
        let greeting = FnComponent::new("Greeting", |props| {
            let name = props.get_str("name").unwrap_or("world").to_string();
            Ok(Element::new("h1").child(format!("Hello, {}", name)).into())
        })
        .shared();

        let node = Node::invoke(greeting, Props::new().with("name", "Ada"));

        assert_eq!(serialize(&node), "<h1>Hello, Ada</h1>");
    }

    #[test]
    fn failing_components_are_contained() {
        let failing = FnComponent::new("Failing", |_| Err(RenderError::Failed("nope".into()))).shared();
        let panicking = FnComponent::new("Panicking", |_| panic!("boom")).shared();

        let node: Node = Element::new("ul")
            .child(Element::new("li").child("first"))
            .child(Node::invoke(failing, Props::new()))
            .child(Element::new("li").child(Node::invoke(panicking, Props::new())))
            .child(Element::new("li").child("last"))
            .into();

        assert_eq!(
            serialize(&node),
            "<ul><li>first</li><li></li><li>last</li></ul>"
        );
    }

    #[test]
    fn strict_serialization_surfaces_root_failure() {
        let failing = FnComponent::new("Failing", |_| Err(RenderError::MissingProp("id".into()))).shared();
        let invocation = Invocation::new(failing, Props::new());

        assert!(matches!(
            serialize_strict(&invocation),
            Err(RenderError::MissingProp(_))
        ));
    }

    #[test]
    fn expansion_matches_direct_serialization() {
        let item = FnComponent::new("Item", |props| {
            Ok(Element::new("li").child(props.get_str("label").unwrap_or("").to_string()).into())
        })
        .shared();
        let broken = FnComponent::new("Broken", |_| Err(RenderError::Failed("x".into()))).shared();

        let node: Node = Element::new("ul")
            .child(Node::invoke(item.clone(), Props::new().with("label", "a")))
            .child(Node::invoke(broken, Props::new()))
            .child(Node::invoke(item, Props::new().with("label", "b")))
            .into();

        let expanded = expand(&node);

        assert_eq!(serialize(&expanded), serialize(&node));
        assert_eq!(serialize(&expanded), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn opaque_values_coerce_or_vanish() {
        struct Broken;
        impl fmt::Display for Broken {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        struct Exploding;
        impl fmt::Display for Exploding {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("no text form")
            }
        }

        assert_eq!(serialize(&Node::opaque(3.5f32)), "3.5");
        assert_eq!(serialize(&Node::opaque(Broken)), "");

        let list: Node = Element::new("ul")
            .child("a")
            .child(Node::opaque(Exploding))
            .child("b")
            .into();
        assert_eq!(serialize(&list), "<ul>ab</ul>");
    }

    #[test]
    fn children_props_classify_into_nodes() {
        let wrapper = FnComponent::new("Wrapper", |props| {
            let children = props.get("children").cloned().unwrap_or(Value::Null);
            Ok(Element::new("section").child(Node::classify(children)).into())
        })
        .shared();

        let props = Props::new().with(
            "children",
            vec![Value::from("a"), Value::from(1), Value::Bool(false)],
        );

        assert_eq!(
            serialize(&Node::invoke(wrapper, props)),
            "<section>a1</section>"
        );
    }
}
