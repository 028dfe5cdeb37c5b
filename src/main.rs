use warden::utils::errors::{ErrorCode, WardenError};

fn main() -> Result<(), WardenError> {
    tokio::runtime::Builder::new_multi_thread()
        // Cap the number of blocking threads - argon hashing runs there and a burst of logins
        // would otherwise spawn a thread per request.
        .max_blocking_threads(num_cpus::get())
        .enable_all()
        .build()
        .map_err(|err| ErrorCode::TonicStartError.with_msg(&format!("Unable to build the runtime: {}", err)))?
        .block_on(async {
            warden::lib_main().await
        })
}
