use std::{env, process};

use anyhow::Context;
use log::info;

use rfield::{
    KnownSize, Renderer, Solution, TextRenderer,
    configs::{Adapter, ChainConfig},
    solve,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <chain.json>", args[0]);
        process::exit(1);
    }

    let path = &args[1];
    let config = ChainConfig::load(path).with_context(|| format!("loading {path}"))?;
    let chain = Adapter::new()
        .adapt(&config)
        .with_context(|| format!("invalid chain in {path}"))?;
    info!("loaded {} layer(s) from {path}", chain.len());

    let solution = solve(&chain).context("solving chain")?;
    print!("{}", report(&solution));
    Ok(())
}

fn report(solution: &Solution) -> String {
    let mut out = match solution.resolved() {
        KnownSize::Input(n) => format!("input size: {n}\n"),
        KnownSize::Output(n) => format!("output size: {n}\n"),
    };

    let table = solution.table();
    out.push_str(&format!(
        "global scale: {} (densest tensor: {})\n\n",
        solution.global_scale(),
        table[solution.low_water_mark()].name
    ));

    let name_width = table.iter().map(|l| l.name.len()).max().unwrap_or(0).max(6);
    out.push_str(&format!(
        "{:<name_width$} {:>8} {:>8} {:>8} {:>6} {:>9}\n",
        "tensor", "stride", "v_space", "space", "size", "pad"
    ));
    for layer in table {
        let pad = format!("{},{}", layer.left_pad, layer.right_pad);
        out.push_str(&format!(
            "{:<name_width$} {:>8} {:>8} {:>8} {:>6} {:>9}\n",
            layer.name,
            layer.cumulative_stride.to_string(),
            layer.value_spacing,
            layer.spacing,
            layer.size,
            pad
        ));
    }

    out.push('\n');
    out.push_str(&TextRenderer::default().render(solution.geometry()));
    out
}
