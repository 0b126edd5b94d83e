fn main() {
    #[cfg(feature = "cli")]
    pixdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("pixdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
