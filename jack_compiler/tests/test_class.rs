#[test]
fn test_compile_point_class() {
    let point_jack = include_str!("point.jack");
    let point_vm = include_str!("point.vm");

    match jack_compiler::compile_str(point_jack) {
        Ok(instructions) => {
            assert_eq!(instructions, point_vm);
        }
        Err(err) => {
            panic!("{}", err)
        }
    }
}
