use super::{output, run};

#[test]
fn catch_binds_number_and_message() {
    let source = r#"
sub main()
    try
        x = 1 \ 0
        print "unreachable"
    catch e
        print e.number
        print e.message
        print e.rethrown
    end try
    print "after"
end sub
"#;
    assert_eq!(output(source), " 20\nDivide by Zero.\nfalse\nafter\n");
}

#[test]
fn thrown_strings_become_user_defined_errors() {
    let source = r#"
sub main()
    try
        throw "custom failure"
    catch err
        print err.number; " "; err.message
    end try
end sub
"#;
    assert_eq!(output(source), " 40 custom failure\n");
}

#[test]
fn thrown_assoc_arrays_keep_their_extra_fields() {
    let source = r#"
sub main()
    try
        throw { number: 500, message: "server", code: "E500" }
    catch err
        print err.number
        print err.message
        print err.code
    end try
end sub
"#;
    assert_eq!(output(source), " 500\nserver\nE500\n");
}

#[test]
fn known_numbers_without_a_message_use_the_standard_text() {
    let source = r#"
sub main()
    try
        throw { number: 20 }
    catch err
        print err.message
    end try
    try
        throw { number: 9999 }
    catch err
        print err.message
    end try
end sub
"#;
    assert_eq!(output(source), "Divide by Zero.\nUNKNOWN ERROR\n");
}

#[test]
fn malformed_throws_are_reported() {
    let cases = [
        ("throw 42", "Thrown value neither string nor roAssociativeArray."),
        ("throw { number: \"x\" }", "Thrown \"number\" is not an integer."),
        ("throw { message: 1 }", "Thrown \"message\" is not a string."),
        ("throw { backtrace: 1 }", "Thrown \"backtrace\" is not an object."),
    ];
    for (statement, expected) in cases {
        let source = format!("sub main()\n    {}\nend sub", statement);
        let run = run(&source);
        assert_eq!(run.failure().number(), 38, "{}", statement);
        assert_eq!(run.failure().message, expected);
    }
}

#[test]
fn rethrown_errors_keep_the_original_backtrace() {
    let source = r#"
sub main()
    try
        try
            fail()
        catch inner
            throw inner
        end try
    catch outer
        print outer.rethrown
        print outer.number
        print outer.backtrace.count() = inner.backtrace.count()
        print type(outer.rethrow_backtrace)
    end try
end sub

sub fail()
    x = invalid
    x.go()
end sub
"#;
    assert_eq!(output(source), "true\n 236\ntrue\nroArray\n");
}

#[test]
fn backtraces_list_frames_outermost_first() {
    let source = r#"
sub main()
    try
        level1()
    catch e
        for each frame in e.backtrace
            print frame.function
        end for
    end try
end sub

sub level1()
    level2()
end sub

sub level2()
    throw "deep"
end sub
"#;
    assert_eq!(
        output(source),
        "main() As Void\nlevel1() As Void\nlevel2() As Void\n"
    );
}

#[test]
fn loop_signals_pass_through_try() {
    let source = r#"
sub main()
    for i = 1 to 5
        try
            if i = 3 then exit for
            print i
        catch e
            print "caught"
        end try
    end for
end sub
"#;
    assert_eq!(output(source), " 1\n 2\n");
}

#[test]
fn uncaught_throw_fails_the_run_and_is_recorded() {
    let run = run("sub main()\n    throw \"bye\"\nend sub");
    assert_eq!(run.failure().number(), 40);
    assert_eq!(run.failure().message, "bye");
    assert_eq!(run.errors.len(), 1);
}

#[test]
fn reserved_names_cannot_be_assigned() {
    let run = run("sub main()\n    m.x = 1\n    type = 5\nend sub");
    let message = run.failure().message.clone();
    assert!(
        message.contains("Cannot assign a value to reserved name 'type'"),
        "{}",
        message
    );
}

#[test]
fn errors_keep_printed_output() {
    let run = run("sub main()\n    print \"before\"\n    x = 1 + \"a\"\nend sub");
    assert_eq!(run.stdout, "before\n");
    assert_eq!(run.failure().number(), 24);
}

#[test]
fn error_format_includes_file_and_position() {
    let run = run("sub main()\n    x = 1 \\ 0\nend sub");
    let formatted = run.failure().format();
    assert!(formatted.starts_with("test.brs(2,"), "{}", formatted);
    assert!(formatted.ends_with("Divide by Zero."), "{}", formatted);
}
