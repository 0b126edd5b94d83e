#![no_main]
use libfuzzer_sys::fuzz_target;

const COMMANDS: [&str; 4] = ["map", "diff", "compare", "config"];

fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    // First byte picks a subcommand so the flag parsers get exercised.
    let mut args = vec![COMMANDS[usize::from(first) % COMMANDS.len()].to_string()];
    let text = String::from_utf8_lossy(rest);
    args.extend(text.split_whitespace().take(32).map(str::to_string));
    pixdelta::cli::fuzz_try_parse_args(&args);
});
