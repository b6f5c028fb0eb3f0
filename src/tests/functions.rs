use super::{output, run};

#[test]
fn too_few_arguments_names_the_function() {
    let run = run("x = UCase()");
    let message = &run.failure().message;
    assert_eq!(run.failure().number(), 24);
    assert!(message.contains("UCase"), "{}", message);
    assert!(message.contains("argument"), "{}", message);
    assert!(message.contains("requires at least 1 argument(s), but received 0."), "{}", message);
}

#[test]
fn wrong_argument_type_names_the_parameter() {
    let run = run("x = Left(\"abc\", \"two\")");
    let message = &run.failure().message;
    assert!(
        message.contains("Argument 'n' must be of type Integer, but received String."),
        "{}",
        message
    );
}

#[test]
fn too_many_arguments_to_a_user_function() {
    let source = "sub main()\n    greet(1, 2)\nend sub\nsub greet(name)\nend sub";
    let message = run(source).failure().message.clone();
    assert!(message.contains("accepts at most 1 argument(s), but received 2."), "{}", message);
}

#[test]
fn omitted_arguments_take_their_defaults() {
    let source = r#"
sub main()
    print add(1)
    print add(1, 5)
end sub

function add(a as integer, b = 2 as integer) as integer
    return a + b
end function
"#;
    assert_eq!(output(source), " 3\n 6\n");
}

#[test]
fn return_values_coerce_to_the_declared_kind() {
    let source = r#"
sub main()
    print type(half())
    print type(whole())
end sub

function half() as float
    return 1
end function

function whole() as integer
    return 2.75
end function
"#;
    assert_eq!(output(source), "Float\nInteger\n");
}

#[test]
fn returning_a_value_from_a_sub_is_an_error() {
    let run = run("sub main()\n    helper()\nend sub\nsub helper()\n    return 1\nend sub");
    assert_eq!(run.failure().number(), 170);
}

#[test]
fn bare_return_from_a_typed_function_is_an_error() {
    let source = "sub main()\n    x = count()\nend sub\nfunction count() as integer\n    return\nend function";
    assert_eq!(run(source).failure().number(), 169);
}

#[test]
fn falling_off_the_end_returns_invalid() {
    let source = "sub main()\n    print nothing()\nend sub\nfunction nothing()\nend function";
    assert_eq!(output(source), "invalid\n");
}

#[test]
fn methods_pulled_from_an_assoc_array_see_it_as_m() {
    let source = r#"
sub main()
    counter = { value: 1 }
    counter.bump = increment
    counter.bump()
    counter["bump"]()
    print counter.value
end sub

sub increment()
    m.value = m.value + 1
end sub
"#;
    assert_eq!(output(source), " 3\n");
}

#[test]
fn plain_calls_use_the_global_m() {
    let source = r#"
sub main()
    m.greeting = "hi"
    speak()
    print GetGlobalAA().greeting
end sub

sub speak()
    print m.greeting
end sub
"#;
    assert_eq!(output(source), "hi\nhi\n");
}

#[test]
fn anonymous_functions_are_values() {
    let source = r#"
sub main()
    double = function(x)
        return x * 2
    end function
    print double(21)
end sub
"#;
    assert_eq!(output(source), " 42\n");
}

#[test]
fn redeclaring_a_function_is_an_error() {
    let source = "sub twice()\nend sub\nsub twice()\nend sub";
    let message = run(source).failure().message.clone();
    assert!(
        message.contains("Attempting to declare function 'twice'"),
        "{}",
        message
    );
    assert!(message.contains("already exists in this scope"), "{}", message);
}

#[test]
fn calling_a_non_function_is_an_error() {
    let run = run("sub main()\n    x = 5\n    x()\nend sub");
    assert_eq!(run.failure().number(), 224);
}

#[test]
fn optional_calls_on_invalid_yield_invalid() {
    assert_eq!(output("x = invalid\nprint x?.missing?()"), "invalid\n");
}

#[test]
fn boxed_primitives_expose_methods() {
    let source = r#"
sub main()
    s = "Hello"
    print s.len()
    print s.ucase()
    n = 5
    print n.toStr()
end sub
"#;
    assert_eq!(output(source), " 5\nHELLO\n5\n");
}

#[test]
fn unknown_member_functions_are_errors() {
    let run = run("sub main()\n    s = \"abc\"\n    s.nope()\nend sub");
    assert_eq!(run.failure().number(), 244);
}

#[test]
fn recursion_works_within_the_depth_limit() {
    let source = r#"
sub main()
    print fact(10)
end sub

function fact(n as integer) as integer
    if n <= 1 then return 1
    return n * fact(n - 1)
end function
"#;
    assert_eq!(output(source), " 3628800\n");
}
