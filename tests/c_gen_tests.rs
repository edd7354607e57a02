//! Program generation from module files on disk.

use anyhow::{Context, Result, bail, ensure};
use camino::Utf8PathBuf;
use gosh_freeze::c_gen::{CLiteral, GenError, escape_c_bytes, generate, generate_from_plan};
use gosh_freeze::ir::{LinearOrder, NativeExtensionSet};
use rstest::rstest;
use test_support::ModuleTree;

/// Decode the body of a C string literal as a C compiler would.
fn unescape(literal: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut bytes = literal.bytes();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next().context("dangling backslash")? {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            d @ b'0'..=b'7' => {
                let d2 = bytes.next().context("short octal escape")?;
                let d3 = bytes.next().context("short octal escape")?;
                let value = u32::from(d - b'0') * 64 + u32::from(d2 - b'0') * 8 + u32::from(d3 - b'0');
                out.push(u8::try_from(value).context("octal escape out of range")?);
            }
            other => bail!("unexpected escape \\{}", char::from(other)),
        }
    }
    Ok(out)
}

/// Concatenate adjacent literals the way the C preprocessor does.
fn join_literals(rendered: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for piece in rendered.lines() {
        let body = piece
            .trim()
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .with_context(|| format!("not a literal: {piece}"))?;
        out.extend(unescape(body)?);
    }
    Ok(out)
}

#[test]
fn arbitrary_bytes_survive_escaping() -> Result<()> {
    let input: Vec<u8> = (0..=255u8).chain(b"\"\\\n\r1".iter().copied()).collect();
    ensure!(unescape(&escape_c_bytes(&input))? == input, "byte round trip failed");
    ensure!(escape_c_bytes(&input).is_ascii(), "escaped text must be ASCII");
    Ok(())
}

#[test]
fn split_literals_concatenate_to_the_original() -> Result<()> {
    let text = "(define (main args)\n  (print \"héllo\\tworld\")\n  0)";
    let rendered = CLiteral::new(text.as_bytes(), "    ").to_string();
    ensure!(rendered.lines().count() == 3, "one literal per line: {rendered}");
    ensure!(join_literals(&rendered)? == text.as_bytes(), "concatenation changed bytes");
    Ok(())
}

#[test]
fn modules_are_embedded_verbatim_in_order() -> Result<()> {
    let tree = ModuleTree::new();
    let dep = tree.write("lib/dep.scm", "(define-module dep (export x))\n(define x 1)\n");
    let main = tree.write("main.scm", "(use dep)\n(define (main args) x)\n");
    let order = LinearOrder::new(vec![dep.clone(), main.clone()]);
    let program = generate_from_plan(&order, &NativeExtensionSet::default())?;
    let text = program.as_str();

    let dep_call = text
        .find(&format!("frozen_load(\"{dep}\""))
        .context("dep load call")?;
    let main_call = text
        .find(&format!("frozen_load(\"{main}\""))
        .context("main load call")?;
    ensure!(dep_call < main_call, "dependency must load first");
    ensure!(
        text.contains("\"(define-module dep (export x))\\n\""),
        "module text missing"
    );
    Ok(())
}

#[test]
fn unreadable_module_fails_generation() -> Result<()> {
    let tree = ModuleTree::new();
    let missing = tree.root().join("gone.scm");
    let order = LinearOrder::new(vec![missing.clone()]);
    match generate_from_plan(&order, &NativeExtensionSet::default()) {
        Err(GenError::ReadModule { path, .. }) => {
            ensure!(path == missing, "wrong path {path}");
            Ok(())
        }
        other => bail!("expected a read error, got {other:?}"),
    }
}

/// The generated program with whitespace runs collapsed to single spaces.
fn flattened_program() -> Result<String> {
    let set = NativeExtensionSet::new(vec![Utf8PathBuf::from("/x/y.so")]);
    let program = generate(&[], &set)?;
    Ok(program.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Text of the C function starting at `signature`, up to its closing brace.
fn function<'a>(program: &'a str, signature: &str) -> Result<&'a str> {
    let start = program
        .find(signature)
        .with_context(|| format!("{signature} missing"))?;
    let rest = program.get(start..).context("function start")?;
    let end = rest.find("\n}").with_context(|| format!("{signature} unterminated"))?;
    rest.get(..end).context("function end")
}

fn position(text: &str, needle: &str) -> Result<usize> {
    text.find(needle).with_context(|| format!("missing `{needle}`"))
}

#[rstest]
#[case::integer_result_is_the_exit_code(
    "if (packet.numResults > 0 && SCM_INTP(packet.results[0])) { Scm_Exit((int)SCM_INT_VALUE(packet.results[0])); }"
)]
#[case::no_main_exits_zero("if (!SCM_PROCEDUREP(main_proc)) { Scm_Exit(0); }")]
#[case::uncaught_error_is_reported_then_exits_70(
    "if (Scm_Apply(main_proc, SCM_LIST1(args), &packet) < 0) { frozen_report(\"main\", packet.exception); Scm_Exit(EX_SOFTWARE); }"
)]
#[case::failed_module_exits_70("if (frozen_load_modules() < 0) { Scm_Exit(EX_SOFTWARE); }")]
fn main_maps_outcomes_to_exit_codes(#[case] branch: &str) -> Result<()> {
    let flat = flattened_program()?;
    let main = flat
        .get(position(&flat, "int main(int argc, char **argv)")?..)
        .context("main body")?;
    ensure!(main.contains(branch), "main lacks `{branch}`");
    Ok(())
}

#[test]
fn non_integer_result_falls_through_to_70() -> Result<()> {
    let flat = flattened_program()?;
    ensure!(flat.contains("#define EX_SOFTWARE 70"), "EX_SOFTWARE undefined");
    let main = flat
        .get(position(&flat, "int main(int argc, char **argv)")?..)
        .context("main body")?;
    let int_exit = position(main, "Scm_Exit((int)SCM_INT_VALUE(packet.results[0]));")?;
    let tail = main.get(int_exit..).context("after integer exit")?;
    ensure!(
        tail.contains("} Scm_Exit(EX_SOFTWARE); return EX_SOFTWARE; }"),
        "non-integer results must exit with EX_SOFTWARE"
    );
    Ok(())
}

#[test]
fn bundled_extensions_are_checked_before_the_filesystem() -> Result<()> {
    let set = NativeExtensionSet::new(vec![Utf8PathBuf::from("/x/y.so")]);
    let program = generate(&[], &set)?;
    let find_file = function(program.as_str(), "ScmObj Scm_FindFile(")?;
    let lookup = position(find_file, "frozen_lookup_extension(request, suffixes)")?;
    let early_return = position(find_file, "if (bundled != NULL) {")?;
    let first_probe = position(find_file, "frozen_try_suffixes(")?;
    ensure!(
        lookup < early_return && early_return < first_probe,
        "extension table must short-circuit the search"
    );
    let table_scan = function(program.as_str(), "static const char *frozen_lookup_extension(")?;
    ensure!(!table_scan.contains("stat("), "table lookup must not touch the filesystem");
    Ok(())
}

#[test]
fn misses_honour_the_quiet_flag() -> Result<()> {
    let flat = flattened_program()?;
    let quiet = position(&flat, "if (flags & SCM_LOAD_QUIET_NOFILE) return SCM_FALSE;")?;
    let loud = position(&flat, "Scm_Error(\"cannot find \\\"%s\\\" in %S\", request, searched);")?;
    ensure!(quiet < loud, "quiet misses must return before raising");
    Ok(())
}
