use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CodegenReturn};
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions, MinifierReturn};
use oxc::parser::{Parser, ParserReturn};
use oxc::span::SourceType;

use crate::report::{Error, Report};

/// Minify an ES module, such as the glue code emitted by `wasm-bindgen`.
pub fn minify(source: &str) -> Report<String> {
    // Memory arena where AST nodes are allocated.
    let allocator = Allocator::default();

    let ParserReturn {
        mut program,
        errors,
        panicked,
        ..
    } = Parser::new(&allocator, source, SourceType::mjs()).parse();

    if panicked || !errors.is_empty() {
        let details = errors
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        return Err(Error::message(format!(
            "failed to parse javascript\n{details}"
        )));
    }

    let options = MinifierOptions {
        mangle: true,
        compress: CompressOptions::all_true(),
    };

    let MinifierReturn { mangler } = Minifier::new(options).build(&allocator, &mut program);

    let options = CodegenOptions {
        minify: true,
        single_quote: true,
        comments: false,
        annotation_comments: false,
        ..CodegenOptions::default()
    };

    let CodegenReturn { code, .. } = Codegen::new()
        .with_options(options)
        .with_mangler(mangler)
        .build(&program);

    Ok(code)
}
