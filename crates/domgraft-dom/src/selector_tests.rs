use super::*;

/// body > div#main.grid[data-kind="cards"] > (article.card[data-asset-id=a1], article.card.pinned, span)
fn fixture() -> (Tree, Vec<NodeId>) {
    let (mut tree, _head, body) = Tree::new();
    let main = tree.alloc_element("div");
    tree.attach(body, main, None);
    {
        let el = tree.element_mut(main).unwrap();
        el.attributes.insert("id".into(), "main".into());
        el.attributes.insert("class".into(), "grid wide".into());
        el.attributes.insert("data-kind".into(), "cards".into());
    }

    let first = tree.alloc_element("article");
    tree.attach(main, first, None);
    {
        let el = tree.element_mut(first).unwrap();
        el.attributes.insert("class".into(), "card".into());
        el.attributes.insert("data-asset-id".into(), "a1".into());
        el.attributes.insert("lang".into(), "en-US".into());
    }

    let second = tree.alloc_element("article");
    tree.attach(main, second, None);
    tree.element_mut(second)
        .unwrap()
        .attributes
        .insert("class".into(), "card pinned".into());

    let span = tree.alloc_element("span");
    tree.attach(main, span, None);
    let text = tree.alloc_text("hello");
    tree.attach(span, text, None);

    (tree, vec![main, first, second, span])
}

fn matches(tree: &Tree, node: NodeId, selector: &str) -> bool {
    SelectorList::parse(selector).unwrap().matches(tree, node)
}

#[test]
fn test_type_id_and_class() {
    let (tree, nodes) = fixture();
    let main = nodes[0];
    assert!(matches(&tree, main, "div"));
    assert!(matches(&tree, main, "DIV"));
    assert!(matches(&tree, main, "#main"));
    assert!(matches(&tree, main, ".grid"));
    assert!(matches(&tree, main, "div#main.grid.wide"));
    assert!(!matches(&tree, main, ".gri"));
    assert!(!matches(&tree, main, "span#main"));
    assert!(matches(&tree, main, "*"));
}

#[test]
fn test_attribute_operators() {
    let (tree, nodes) = fixture();
    let first = nodes[1];
    assert!(matches(&tree, first, "[data-asset-id]"));
    assert!(matches(&tree, first, "[data-asset-id=a1]"));
    assert!(matches(&tree, first, "[data-asset-id='a1']"));
    assert!(matches(&tree, first, "[data-asset-id=\"a1\"]"));
    assert!(matches(&tree, first, "[data-asset-id^=a]"));
    assert!(matches(&tree, first, "[data-asset-id$='1']"));
    assert!(matches(&tree, first, "[data-asset-id*=a]"));
    assert!(matches(&tree, first, "[class~=card]"));
    assert!(matches(&tree, first, "[lang|=en]"));
    assert!(!matches(&tree, first, "[data-asset-id=a2]"));
    assert!(!matches(&tree, first, "[missing]"));
}

#[test]
fn test_combinators() {
    let (tree, nodes) = fixture();
    let (first, second, span) = (nodes[1], nodes[2], nodes[3]);
    assert!(matches(&tree, first, "body article"));
    assert!(matches(&tree, first, "#main > .card"));
    assert!(!matches(&tree, first, "body > .card"));
    assert!(matches(&tree, second, ".card + .pinned"));
    assert!(matches(&tree, span, "[data-asset-id] ~ span"));
    assert!(!matches(&tree, first, ".pinned ~ .card"));
}

#[test]
fn test_pseudo_classes() {
    let (tree, nodes) = fixture();
    let (first, second, span) = (nodes[1], nodes[2], nodes[3]);
    assert!(matches(&tree, first, "article:first-child"));
    assert!(!matches(&tree, second, "article:first-child"));
    assert!(matches(&tree, span, "span:last-child"));
    assert!(matches(&tree, first, ".card:not(.pinned)"));
    assert!(!matches(&tree, second, ".card:not(.pinned)"));
    assert!(matches(&tree, first, "article:empty"));
    assert!(!matches(&tree, span, "span:empty"));
}

#[test]
fn test_selector_list() {
    let (tree, nodes) = fixture();
    assert!(matches(&tree, nodes[3], ".nothing, span"));
    assert!(!matches(&tree, nodes[3], ".nothing, .still-nothing"));
}

#[test]
fn test_text_nodes_never_match() {
    let (tree, nodes) = fixture();
    let text = tree.children(nodes[3])[0];
    assert!(!matches(&tree, text, "*"));
}

#[test]
fn test_invalid_selectors() {
    for selector in ["", "   ", "div[", "div[x=", ".", "#", "div >", ":hover", "a,", "div)", "[x=\"y]"] {
        let result = SelectorList::parse(selector);
        assert!(result.is_err(), "expected '{}' to be rejected", selector);
    }
}

#[test]
fn test_invalid_selector_error_mentions_input() {
    let err = SelectorList::parse("div[").unwrap_err();
    assert!(err.to_string().contains("div["));
}
