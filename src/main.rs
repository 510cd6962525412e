use gatehouse::utils::errors::GateError;

fn main() -> Result<(), GateError> {
    tokio::runtime::Builder::new_multi_thread()
        // Cap the number of blocking threads - argon verification runs there and heavy
        // login load can otherwise see explosions of threads.
        .max_blocking_threads(num_cpus::get())
        .enable_all()
        .build()
        .unwrap()
        .block_on(async {
            gatehouse::lib_main().await
        })
}
