use super::{output, run};

#[test]
fn positive_numbers_get_a_leading_space() {
    assert_eq!(
        output("print 6\nprint -6\nprint 0\nprint 2.5\nprint \"text\"\nprint true"),
        " 6\n-6\n 0\n 2.5\ntext\ntrue\n"
    );
}

#[test]
fn commas_advance_to_the_next_sixteen_column_zone() {
    assert_eq!(output("print \"a\", \"b\""), format!("a{}b\n", " ".repeat(15)));
    assert_eq!(
        output("print \"0123456789abcdef\", \"x\""),
        format!("0123456789abcdef{}x\n", " ".repeat(16))
    );
}

#[test]
fn trailing_semicolon_suppresses_the_newline() {
    assert_eq!(output("print \"a\";\nprint \"b\""), "ab\n");
}

#[test]
fn zones_continue_across_unterminated_prints() {
    assert_eq!(output("print \"abc\";\nprint \"\", \"d\""), format!("abc{}d\n", " ".repeat(13)));
}

#[test]
fn question_mark_is_print() {
    assert_eq!(output("? \"short\""), "short\n");
}

#[test]
fn tab_and_pos_exist_only_inside_print() {
    assert_eq!(output("print \"ab\"; tab(5); \"c\""), "ab   c\n");
    assert_eq!(output("print \"abc\"; pos(0)"), "abc 3\n");
    let run = run("x = tab(3)");
    assert_eq!(run.failure().number(), 224);
}

#[test]
fn floats_print_with_six_significant_digits() {
    assert_eq!(
        output("print 1 / 3\nprint 10000000.0\nprint 0.5"),
        " 0.333333\n 1e+07\n 0.5\n"
    );
}

#[test]
fn containers_print_their_contents() {
    let expected = "<Component: roArray> =\n[\n    1\n    \"two\"\n]\n";
    assert_eq!(output("print [1, \"two\"]"), expected);
}

#[test]
fn standard_library_string_helpers() {
    let source = r#"
print Len("hello")
print UCase("abc"); LCase("DEF")
print Left("brightscript", 6); "|"; Right("brightscript", 6)
print Mid("brightscript", 7)
print Instr(1, "brightscript", "script")
print Chr(65); Asc("a")
print Str(3.5); StrI(255, 16)
"#;
    assert_eq!(
        output(source),
        " 5\nABCdef\nbright|script\nscript\n 7\nA 97\n 3.5ff\n"
    );
}

#[test]
fn standard_library_numeric_helpers() {
    assert_eq!(
        output("print Int(2.7); Int(-2.7)\nprint Fix(-2.7)\nprint Abs(-4)\nprint Sqr(16)\nprint Val(\"12.5\")"),
        " 2-3\n-2\n 4\n 4\n 12.5\n"
    );
}

#[test]
fn missing_entry_point_is_not_an_error() {
    let run = run("x = 1");
    assert!(run.result.is_ok());
    assert_eq!(run.stdout, "");
}

#[test]
fn tab_past_the_column_limit_is_an_error() {
    let run = run("print \"a\"; tab(100000)");
    assert_eq!(run.failure().number(), 26);
    assert_eq!(run.stdout, "");
}
