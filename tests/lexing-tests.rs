use std::io::Write;

use goldenfile::Mint;

fn lexing_test(source: &str, goldenfile: &str) {
    let mut mint = Mint::new("tests/goldenfiles/lexing");
    let mut goldenfile = mint.new_goldenfile(goldenfile).unwrap();

    let tokens = cinder::lex(source).unwrap();
    for (token, _) in tokens {
        writeln!(goldenfile, "{token}").unwrap();
    }
}

#[test]
fn tour() {
    lexing_test(include_str!("testfiles/tour.cinder"), "tour.golden");
}
