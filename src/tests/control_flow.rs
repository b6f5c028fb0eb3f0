use super::{output, run};

#[test]
fn wrong_signed_step_runs_the_body_zero_times() {
    let source = r#"
sub main()
    for i = 10 to 0 step 1
        print "body"
    end for
    print "done"
end sub
"#;
    assert_eq!(output(source), "done\n");
}

#[test]
fn for_counts_down_with_a_negative_step() {
    let source = r#"
sub main()
    for i = 3 to 1 step -1
        print i
    next
    print i
end sub
"#;
    assert_eq!(output(source), " 3\n 2\n 1\n 0\n");
}

#[test]
fn zero_step_counts_as_descending() {
    let source = r#"
sub main()
    passes = 0
    for i = 0 to 5 step 0
        passes = passes + 1
        if passes > 3 then exit for
    end for
    print passes
    passes = 0
    for i = 5 to 0 step 0
        passes = passes + 1
        if passes > 3 then exit for
    end for
    print passes; i
end sub
"#;
    assert_eq!(output(source), " 0\n 4 5\n");
}

#[test]
fn for_evaluates_its_limit_once() {
    let source = r#"
sub main()
    n = 3
    for i = 1 to n
        n = 1
        print i
    end for
end sub
"#;
    assert_eq!(output(source), " 1\n 2\n 3\n");
}

#[test]
fn exit_and_continue_for() {
    let source = r#"
sub main()
    for i = 1 to 10
        if i = 2 then continue for
        if i = 4 then exit for
        print i
    end for
end sub
"#;
    assert_eq!(output(source), " 1\n 3\n");
}

#[test]
fn while_checks_before_each_iteration() {
    let source = r#"
sub main()
    i = 5
    while i < 5
        print "never"
    end while
    while true
        i = i + 1
        if i = 6 then continue while
        if i > 7 then exit while
        print i
    end while
end sub
"#;
    assert_eq!(output(source), " 7\n");
}

#[test]
fn for_each_walks_arrays_and_sorted_keys() {
    let source = r#"
sub main()
    for each n in [1, 2, 3]
        print n;
    end for
    print ""
    for each key in { zeta: 1, Alpha: 2, beta: 3 }
        print key
    end for
end sub
"#;
    assert_eq!(output(source), " 1 2 3\nAlpha\nbeta\nzeta\n");
}

#[test]
fn for_each_over_a_snapshot() {
    let source = r#"
sub main()
    items = [1, 2]
    for each n in items
        items.push(n)
    end for
    print items.count()
end sub
"#;
    assert_eq!(output(source), " 4\n");
}

#[test]
fn for_each_on_a_non_collection_is_skipped_with_a_diagnostic() {
    let run = run("sub main()\n    for each c in 42\n        print c\n    end for\n    print \"after\"\nend sub");
    assert!(run.result.is_ok());
    assert_eq!(run.stdout, "after\n");
    assert!(
        run.stderr.contains("FOR EACH value is not an enumerable object"),
        "{}",
        run.stderr
    );
    assert!(run.errors.is_empty());
}

#[test]
fn goto_skips_forward_and_loops_backward() {
    let source = r#"
sub main()
    goto skip
    print "skipped"
skip:
    i = 0
again:
    i = i + 1
    if i < 3 then goto again
    print i
end sub
"#;
    assert_eq!(output(source), " 3\n");
}

#[test]
fn goto_into_a_loop_body_resumes_the_loop() {
    let source = r#"
sub main()
    for i = 1 to 3
        if i = 2 then goto inside
        print "top"; i
inside:
        print "bottom"; i
    end for
end sub
"#;
    assert_eq!(output(source), "top 1\nbottom 1\nbottom 2\ntop 3\nbottom 3\n");
}

#[test]
fn goto_to_a_missing_label_fails_at_the_call() {
    let run = run("sub main()\n    goto nowhere\nend sub");
    assert_eq!(run.failure().number(), 14);
    assert!(run.failure().message.contains("Label/Line Not Found."));
}

#[test]
fn loop_exits_outside_loops_are_errors() {
    assert_eq!(run("sub main()\n    exit for\nend sub").failure().number(), 165);
    assert_eq!(run("sub main()\n    exit while\nend sub").failure().number(), 175);
    assert_eq!(run("sub main()\n    continue for\nend sub").failure().number(), 141);
}

#[test]
fn else_if_chains_pick_the_first_true_branch() {
    let source = r#"
sub main()
    for each n in [1, 5, 10]
        if n < 3
            print "small"
        else if n < 8
            print "medium"
        else
            print "large"
        end if
    end for
end sub
"#;
    assert_eq!(output(source), "small\nmedium\nlarge\n");
}

#[test]
fn conditions_are_compared_against_true() {
    assert_eq!(
        output("if 1 then print \"one\"\nif 0 then print \"zero\"\nif \"yes\" then print \"str\"\nprint \"end\""),
        "one\nend\n"
    );
}

#[test]
fn end_stops_before_the_remaining_statements() {
    let run = run("sub main()\n    print 1\n    end\n    print 2\nend sub");
    assert!(run.result.is_ok());
    assert_eq!(run.stdout, " 1\n");
}
