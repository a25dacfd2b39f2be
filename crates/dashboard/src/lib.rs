//! Dashboard page.
//!
//! A fixed two-column layout: a sidebar and a body. The body shows a counter
//! and a button that increments it. Build and serve it with the `dashboard`
//! CLI from `crates/cli`.

use kobold::prelude::*;
use wasm_bindgen::prelude::*;

mod app;
pub mod counter;
pub mod layout;

pub use app::Page;

/// Wasm entry point, mounts the page into `<body>`.
#[wasm_bindgen(start)]
pub fn run() {
    console_error_panic_hook::set_once();

    gloo_console::log!("mounting dashboard");

    kobold::start(view! {
        <Page />
    });
}
