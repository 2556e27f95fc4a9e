use super::*;
use crate::test_support::temp_dir;

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn json_field_names() {
    let order = WorkspaceOrder {
        ordered_names: names(&["b.gif", "a.gif"]),
        original_name: Some("a.gif".into()),
    };
    let v = serde_json::to_value(&order).unwrap();
    assert_eq!(v["orderedNames"][0], "b.gif");
    assert_eq!(v["originalName"], "a.gif");

    let parsed: WorkspaceOrder = serde_json::from_str(r#"{"orderedNames": ["x.gif"]}"#).unwrap();
    assert_eq!(parsed.original_name, None);
}

#[test]
fn persist_and_load() {
    let tmp = temp_dir("order_persist");
    assert_eq!(WorkspaceOrder::load(&tmp).unwrap(), None);

    let order = WorkspaceOrder {
        ordered_names: names(&["z.gif", "a.gif"]),
        original_name: None,
    };
    order.persist(&tmp).unwrap();
    assert_eq!(WorkspaceOrder::load(&tmp).unwrap(), Some(order));

    std::fs::write(WorkspaceOrder::path_in(&tmp), b"{ broken").unwrap();
    assert!(matches!(
        WorkspaceOrder::load(&tmp),
        Err(AnimstreamError::ConfigParse(_))
    ));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn sanitize() {
    assert_eq!(sanitize_name("Cat Walk (v2).GIF"), "catwalkv2gif");
    assert_eq!(sanitize_name("__"), "");
}

#[test]
fn exact_case_insensitive_and_sanitized_matches() {
    let files = names(&["Dog.gif", "a.gif", "cat_walk.gif", "extra.gif", "zeta.gif"]);
    let order = WorkspaceOrder {
        ordered_names: names(&["zeta.gif", "dog.GIF", "missing.gif", "Cat Walk.gif"]),
        original_name: Some("DOG.gif".into()),
    };
    let r = resolve_order(Some(&order), &files);
    assert_eq!(
        r.names,
        names(&["zeta.gif", "Dog.gif", "cat_walk.gif", "a.gif", "extra.gif"])
    );
    assert_eq!(r.original, Some(1));
}

#[test]
fn exact_match_beats_case_insensitive() {
    let files = names(&["A.gif", "a.gif"]);
    let order = WorkspaceOrder {
        ordered_names: names(&["a.gif", "A.gif"]),
        original_name: None,
    };
    let r = resolve_order(Some(&order), &files);
    assert_eq!(r.names, names(&["a.gif", "A.gif"]));
    assert_eq!(r.original, Some(0));
}

#[test]
fn no_order_is_alphabetical_with_first_original() {
    let r = resolve_order(None, &names(&["b.gif", "a.gif"]));
    assert_eq!(r.names, names(&["a.gif", "b.gif"]));
    assert_eq!(r.original, Some(0));

    let r = resolve_order(None, &[]);
    assert!(r.names.is_empty());
    assert_eq!(r.original, None);
}

#[test]
fn unresolved_original_defaults_to_first() {
    let order = WorkspaceOrder {
        ordered_names: names(&["b.gif"]),
        original_name: Some("gone.gif".into()),
    };
    let r = resolve_order(Some(&order), &names(&["a.gif", "b.gif"]));
    assert_eq!(r.names, names(&["b.gif", "a.gif"]));
    assert_eq!(r.original, Some(0));
}

#[test]
fn lists_only_member_files() {
    let tmp = temp_dir("order_list");
    std::fs::create_dir_all(tmp.join("sub.gif")).unwrap();
    for f in ["b.GIF", "a.gif", "notes.txt", ORDER_FILE_NAME] {
        std::fs::write(tmp.join(f), b"x").unwrap();
    }
    assert_eq!(list_workspace_files(&tmp).unwrap(), names(&["a.gif", "b.GIF"]));
    std::fs::remove_dir_all(&tmp).ok();
}
