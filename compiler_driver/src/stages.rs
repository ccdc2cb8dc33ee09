use crate::files;
use crate::locator::FsLocator;
use emitter::Emitter;
use parser::ast::LibraryItem;
use semantic_analysis::{Session, standard};
use shared_context::suppress::SuppressMask;
use shared_context::{Bump, CompilerContext};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

// lex the program then exit without starting the other stages
pub fn lexer_stage(file_path: &Path) -> Result<(), Box<dyn Error>> {
    let input_string = fs::read_to_string(file_path)?;

    let mut lexer = lexer::Lexer::new(&input_string);

    while let Some(tok) = lexer.next() {
        println!(
            "matched string: {}, token type: {:?}",
            tok.get_lexeme(),
            tok.get_token()
        );
    }

    Ok(())
}

pub fn parser_stage(file_path: &Path, _include: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let arena = Bump::new();
    let text = fs::read_to_string(file_path)?;
    let source: &str = arena.alloc_str(&text);
    let file_name: &str = arena.alloc_str(&files::file_name(file_path));

    let mut ctx = CompilerContext::new(&arena);
    standard::install(&mut ctx);

    let lexer = lexer::Lexer::new(source);
    let unit = parser::parse(lexer, file_name, &mut ctx);

    match unit {
        Some(unit) => {
            let name = ctx.interner.lookup(unit.item.name().symbol);
            println!("parsed compilation unit '{}'", name.to_uppercase());
        }
        None => println!("no compilation unit could be formed"),
    }

    finish(&ctx)
}

pub fn analyze_stage(
    file_path: &Path,
    include: &[PathBuf],
    suppress: SuppressMask,
) -> Result<(), Box<dyn Error>> {
    let arena = Bump::new();
    let text = fs::read_to_string(file_path)?;
    let source: &str = arena.alloc_str(&text);
    let file_name: &str = arena.alloc_str(&files::file_name(file_path));

    let mut ctx = CompilerContext::new(&arena);
    standard::install(&mut ctx);
    let locator = FsLocator::new(file_path, include);
    let mut session = Session::new(Box::new(locator), suppress);

    let lexer = lexer::Lexer::new(source);
    let Some(mut unit) = parser::parse(lexer, file_name, &mut ctx) else {
        return finish(&ctx);
    };
    semantic_analysis::analyze(&mut ctx, &mut session, file_name, source, &mut unit);

    finish(&ctx)
}

pub fn emit_ir(
    file_path: &Path,
    include: &[PathBuf],
    suppress: SuppressMask,
    main: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let arena = Bump::new();
    let text = fs::read_to_string(file_path)?;
    let source: &str = arena.alloc_str(&text);
    let file_name: &str = arena.alloc_str(&files::file_name(file_path));

    let mut ctx = CompilerContext::new(&arena);
    standard::install(&mut ctx);
    let locator = FsLocator::new(file_path, include);
    // the probe outlives the session's boxed locator
    let has_body_probe = FsLocator::new(file_path, include);
    let mut session = Session::new(Box::new(locator), suppress);

    let lexer = lexer::Lexer::new(source);
    let Some(mut unit) = parser::parse(lexer, file_name, &mut ctx) else {
        return finish(&ctx);
    };
    semantic_analysis::analyze(&mut ctx, &mut session, file_name, source, &mut unit);

    // a unit with errors analyzes to the end but never lowers
    finish(&ctx)?;

    let unit_name = ctx
        .interner
        .lookup(unit.item.name().symbol)
        .to_string();
    let emit_entry = matches!(unit.item, LibraryItem::Subprogram(_))
        && main.map_or(true, |name| name.eq_ignore_ascii_case(&unit_name));
    let package_has_body = matches!(unit.item, LibraryItem::PackageSpec(_))
        && has_body_probe.has_body(&unit_name);

    let module = ir_gen::lower_unit(&mut ctx, &unit, emit_entry, package_has_body);

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| files::default_output_path(file_path));
    let mut out = fs::File::create(&output_path)?;
    Emitter::new(&module).write_program(&mut out)?;

    Ok(())
}

/// Non-zero diagnostics fail the stage with a summary line.
fn finish(ctx: &CompilerContext) -> Result<(), Box<dyn Error>> {
    let count = ctx.diagnostics.error_count();
    if count == 0 {
        Ok(())
    } else if count == 1 {
        Err("compilation failed with 1 error".into())
    } else {
        Err(format!("compilation failed with {count} errors").into())
    }
}
