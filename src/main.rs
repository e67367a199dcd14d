mod app;
mod runtime;
mod ui;

fn main() -> anyhow::Result<()> {
    runtime::run()
}
