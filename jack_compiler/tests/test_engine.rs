use jack_compiler::{
    compile::CompileError,
    compile_str,
    lex::LexError,
    JackError,
};

/// Compile a source unit and split the instruction text into lines.
fn lines(source: &str) -> Vec<String> {
    compile_str(source)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn test_expression_is_left_to_right() {
    // No operator precedence: `*` binds no tighter than `+`, each
    // operator is emitted right after its right-hand term.
    let out = lines(
        "class Main {
            function void main() {
                var int a;
                let a = 2 + 3 * 4;
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.main 1",
            "push constant 2",
            "push constant 3",
            "add",
            "push constant 4",
            "call Math.multiply 2",
            "pop local 0",
            "return",
        ]
    );
}

#[test]
fn test_call_argument_count_includes_receiver() {
    let out = lines(
        "class Main {
            function void run(Foo obj, int a, int b) {
                do obj.work(a, b);
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.run 0",
            "push argument 0",
            "push argument 1",
            "push argument 2",
            "call Foo.work 3",
            "pop temp 0",
            "return",
        ]
    );
}

#[test]
fn test_sibling_loops_use_distinct_labels() {
    let out = lines(
        "class Main {
            function void spin() {
                while (true) { }
                while (false) { }
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.spin 0",
            "label LOOPSTART1",
            "push constant 1",
            "neg",
            "not",
            "if-goto LOOPEND2",
            "goto LOOPSTART1",
            "label LOOPEND2",
            "label LOOPSTART3",
            "push constant 0",
            "not",
            "if-goto LOOPEND4",
            "goto LOOPSTART3",
            "label LOOPEND4",
            "return",
        ]
    );

    // Four labels, no label reused.
    let mut labels: Vec<&String> = out.iter().filter(|l| l.starts_with("label ")).collect();
    assert_eq!(labels.len(), 4);
    labels.sort();
    labels.dedup();
    assert_eq!(labels.len(), 4);
}

#[test]
fn test_constructor_allocates_field_count() {
    let out = lines(
        "class Vec3 {
            field int x, y, z;

            constructor Vec3 new() {
                return this;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Vec3.new 0",
            "push constant 3",
            "call Memory.alloc 1",
            "pop pointer 0",
            "push pointer 0",
            "return",
        ]
    );
}

#[test]
fn test_function_operand_counts_locals_exactly() {
    let out = lines(
        "class Main {
            function int f() {
                var int a, b;
                var boolean flag;
                return 0;
            }
        }",
    );
    assert_eq!(out[0], "function Main.f 3");
}

#[test]
fn test_method_receiver_shares_argument_zero() {
    // No argument slot is reserved for the implicit receiver: the
    // first explicit parameter lands at index 0, the same slot the
    // prologue reads the receiver from.
    let out = lines(
        "class Counter {
            field int total;

            method void add(int amount) {
                let total = total + amount;
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Counter.add 0",
            "push argument 0",
            "pop pointer 0",
            "push this 0",
            "push argument 0",
            "add",
            "pop this 0",
            "return",
        ]
    );
}

#[test]
fn test_let_array_element_write() {
    let out = lines(
        "class Main {
            function void fill(Array arr, int i) {
                let arr[i] = 7;
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.fill 0",
            "push argument 0",
            "push argument 1",
            "add",
            "pop pointer 1",
            "push constant 7",
            "pop that 0",
            "return",
        ]
    );
}

#[test]
fn test_array_element_read() {
    let out = lines(
        "class Main {
            function int get(Array arr) {
                return arr[2];
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.get 0",
            "push argument 0",
            "push constant 2",
            "add",
            "pop pointer 1",
            "push that 0",
            "return",
        ]
    );
}

#[test]
fn test_if_else_lowering() {
    let out = lines(
        "class Main {
            function int pick(boolean flag) {
                if (flag) {
                    return 1;
                } else {
                    return 2;
                }
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.pick 0",
            "push argument 0",
            "if-goto IFTRUE1",
            "goto IFFALSE2",
            "label IFTRUE1",
            "push constant 1",
            "return",
            "goto IFEND3",
            "label IFFALSE2",
            "push constant 2",
            "return",
            "label IFEND3",
        ]
    );
}

#[test]
fn test_string_literal_builds_object_on_stack() {
    let out = lines(
        r#"class Main {
            function void greet() {
                do Output.printString("Hi!");
                return;
            }
        }"#,
    );
    assert_eq!(
        out,
        vec![
            "function Main.greet 0",
            "push constant 3",
            "call String.new 1",
            "push constant 72",
            "call String.appendChar 2",
            "push constant 105",
            "call String.appendChar 2",
            "push constant 33",
            "call String.appendChar 2",
            "call Output.printString 1",
            "pop temp 0",
            "return",
        ]
    );
}

#[test]
fn test_bare_call_targets_current_object() {
    let out = lines(
        "class Game {
            method void tick() {
                do update();
                return;
            }

            method void update() {
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Game.tick 0",
            "push argument 0",
            "pop pointer 0",
            "push pointer 0",
            "call Game.update 1",
            "pop temp 0",
            "return",
            "function Game.update 0",
            "push argument 0",
            "pop pointer 0",
            "return",
        ]
    );
}

#[test]
fn test_local_shadows_field() {
    let out = lines(
        "class Thing {
            field int x;

            method int shadow() {
                var int x;
                let x = 5;
                return x;
            }

            method int real() {
                return x;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Thing.shadow 1",
            "push argument 0",
            "pop pointer 0",
            "push constant 5",
            "pop local 0",
            "push local 0",
            "return",
            "function Thing.real 0",
            "push argument 0",
            "pop pointer 0",
            "push this 0",
            "return",
        ]
    );
}

#[test]
fn test_unary_and_grouping() {
    let out = lines(
        "class Main {
            function void f() {
                var boolean a;
                let a = ~(1 < 2);
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.f 1",
            "push constant 1",
            "push constant 2",
            "lt",
            "not",
            "pop local 0",
            "return",
        ]
    );
}

#[test]
fn test_keyword_constants() {
    let out = lines(
        "class Main {
            function void f() {
                var int a;
                let a = null;
                let a = false;
                let a = true;
                return;
            }
        }",
    );
    assert_eq!(
        out,
        vec![
            "function Main.f 1",
            "push constant 0",
            "pop local 0",
            "push constant 0",
            "pop local 0",
            "push constant 1",
            "neg",
            "pop local 0",
            "return",
        ]
    );
}

#[test]
fn test_unexpected_statement_keyword_is_fatal() {
    let result = compile_str(
        "class Main {
            function void f() {
                else
            }
        }",
    );
    assert!(matches!(
        result,
        Err(JackError::Compile(CompileError::UnexpectedToken { .. }))
    ));
}

#[test]
fn test_duplicate_symbol_is_fatal() {
    let result = compile_str(
        "class Main {
            function void f() {
                var int x;
                var int x;
                return;
            }
        }",
    );
    assert!(matches!(
        result,
        Err(JackError::Compile(CompileError::DuplicateSymbol(name))) if name == "x"
    ));
}

#[test]
fn test_unresolved_let_target_is_fatal() {
    let result = compile_str(
        "class Main {
            function void f() {
                let y = 1;
                return;
            }
        }",
    );
    assert!(matches!(
        result,
        Err(JackError::Compile(CompileError::UnresolvedSymbol(name))) if name == "y"
    ));
}

#[test]
fn test_unterminated_comment_is_fatal() {
    let result = compile_str("class Main { /* dangling");
    assert!(matches!(
        result,
        Err(JackError::Lex(LexError::UnterminatedComment { line: 1 }))
    ));
}

#[test]
fn test_truncated_source_is_fatal() {
    let result = compile_str("class Main {");
    assert!(matches!(
        result,
        Err(JackError::Compile(CompileError::UnexpectedEnd))
    ));
}
