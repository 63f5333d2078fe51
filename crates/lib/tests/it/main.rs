/*! Integration tests for Latemark.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - queue: Durable queue behavior across restarts
 * - server: The batch endpoint over real HTTP
 * - sync: Orchestrator properties, end-to-end runs and background triggers
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("latemark=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod queue;
mod server;
mod sync;
