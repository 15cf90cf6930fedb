use jack_compiler::tokenize_to_markup;

#[test]
fn test_token_markup_escapes_sensitive_symbols() {
    let markup = tokenize_to_markup("if (a < b) { let c = a & 1; }").unwrap();
    assert_eq!(
        markup,
        "<tokens>\n\
         <keyword> if </keyword>\n\
         <symbol> ( </symbol>\n\
         <identifier> a </identifier>\n\
         <symbol> &lt; </symbol>\n\
         <identifier> b </identifier>\n\
         <symbol> ) </symbol>\n\
         <symbol> { </symbol>\n\
         <keyword> let </keyword>\n\
         <identifier> c </identifier>\n\
         <symbol> = </symbol>\n\
         <identifier> a </identifier>\n\
         <symbol> &amp; </symbol>\n\
         <integerConstant> 1 </integerConstant>\n\
         <symbol> ; </symbol>\n\
         <symbol> } </symbol>\n\
         </tokens>\n"
    );
}

#[test]
fn test_token_markup_literals() {
    let markup = tokenize_to_markup(r#"do Output.printString("ok");"#).unwrap();
    assert_eq!(
        markup,
        "<tokens>\n\
         <keyword> do </keyword>\n\
         <identifier> Output </identifier>\n\
         <symbol> . </symbol>\n\
         <identifier> printString </identifier>\n\
         <symbol> ( </symbol>\n\
         <stringConstant> ok </stringConstant>\n\
         <symbol> ) </symbol>\n\
         <symbol> ; </symbol>\n\
         </tokens>\n"
    );
}
