//! pact CLI
//!
//! Entry point of the `pact` command. All routing lives in [`pact_cli::dispatch`].

fn main() {
    let code = pact_cli::Dispatcher::new().run(std::env::args_os());
    std::process::exit(code);
}
