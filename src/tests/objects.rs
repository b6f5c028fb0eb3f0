use super::{output, run};

#[test]
fn dim_creates_nested_arrays_sized_by_highest_index() {
    let source = r#"
sub main()
    dim grid[2, 3]
    print grid.count()
    print grid[0].count()
    grid[1][2] = "x"
    grid[2, 3] = "y"
    print grid[1][2]; grid[2][3]
end sub
"#;
    assert_eq!(output(source), " 3\n 4\nxy\n");
}

#[test]
fn indexed_set_grows_arrays() {
    let source = r#"
sub main()
    a = []
    a[2] = 7
    print a.count()
    print a[0]
    print a[2]
    print a[99]
end sub
"#;
    assert_eq!(output(source), " 3\ninvalid\n 7\ninvalid\n");
}

#[test]
fn negative_indexes_on_set_are_out_of_bounds() {
    let run = run("sub main()\n    a = [1]\n    a[-1] = 2\nend sub");
    assert_eq!(run.failure().number(), 16);
}

#[test]
fn non_numeric_array_indexes_are_rejected() {
    let run = run("sub main()\n    a = [1]\n    print a[\"zero\"]\nend sub");
    assert_eq!(run.failure().number(), 232);
}

#[test]
fn indexing_a_non_collection_is_an_error() {
    assert_eq!(run("sub main()\n    n = 4\n    print n[0]\nend sub").failure().number(), 231);
    assert_eq!(run("sub main()\n    n = 4\n    n[0] = 1\nend sub").failure().number(), 228);
    assert_eq!(run("sub main()\n    n = 4\n    n.field = 1\nend sub").failure().number(), 228);
}

#[test]
fn assoc_array_keys_are_case_insensitive() {
    let source = r#"
sub main()
    aa = { Name: "brs" }
    print aa.name
    print aa["NAME"]
    aa.Extra = 1
    aa["MixedCase"] = 2
    print aa.keys().join(",")
    print aa.missing
end sub
"#;
    assert_eq!(output(source), "brs\nbrs\nextra,MixedCase,Name\ninvalid\n");
}

#[test]
fn assoc_array_keys_must_be_strings() {
    let run = run("sub main()\n    aa = {}\n    print aa[1]\nend sub");
    assert_eq!(run.failure().number(), 24);
    assert!(run
        .failure()
        .message
        .contains("\"String\" should be used as key, but received"));
}

#[test]
fn increments_update_variables_members_and_elements() {
    let source = r#"
sub main()
    i = 1
    i++
    aa = { count: 10 }
    aa.count--
    list = [5]
    list[0]++
    print i; aa.count; list[0]
end sub
"#;
    assert_eq!(output(source), " 2 9 6\n");
}

#[test]
fn incrementing_a_string_is_a_mismatch() {
    let run = run("sub main()\n    s = \"a\"\n    s++\nend sub");
    assert_eq!(run.failure().number(), 24);
    assert!(run
        .failure()
        .message
        .contains("Attempting to increment value of non-numeric type \"String\""));
}

#[test]
fn create_object_builds_known_components() {
    let source = r#"
sub main()
    list = CreateObject("roArray")
    list.push("a")
    list.push("b")
    print list.join("-")
    aa = CreateObject("roAssociativeArray")
    aa.addReplace("k", 1)
    print aa.doesExist("K")
    print type(CreateObject("roString"))
end sub
"#;
    assert_eq!(output(source), "a-b\ntrue\nroString\n");
}

#[test]
fn create_object_with_an_unknown_name_returns_invalid() {
    let run = run("sub main()\n    print CreateObject(\"roNothing\")\nend sub");
    assert!(run.result.is_ok());
    assert_eq!(run.stdout, "invalid\n");
    assert!(run.stderr.contains("roNothing"), "{}", run.stderr);
}

#[test]
fn arrays_share_identity_through_assignment() {
    let source = r#"
sub main()
    a = [1, 2]
    b = a
    b.push(3)
    print a.count()
end sub
"#;
    assert_eq!(output(source), " 3\n");
}

#[test]
fn attribute_access_is_not_supported() {
    let run = run("sub main()\n    aa = {}\n    print aa@name\nend sub");
    assert_eq!(run.failure().number(), 244);
}

#[test]
fn oversized_arrays_are_out_of_bounds_and_catchable() {
    let source = r#"
sub main()
    a = []
    try
        a[2000000000000] = 1
    catch e
        print e.number
    end try
    try
        a.setEntry(2000000000000, 1)
    catch e
        print e.number
    end try
    try
        dim grid[100000, 100000]
    catch e
        print e.number
    end try
    print a.count()
end sub
"#;
    assert_eq!(output(source), " 16\n 16\n 16\n 0\n");
}
