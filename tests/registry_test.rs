// Process-wide client registry configured from the environment
//
// Kept in its own test binary: it mutates environment variables.

use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_global_get_client_is_a_singleton() {
    std::env::set_var("VERIFYWISE_BASE_URL", "http://127.0.0.1:3000/");
    std::env::set_var("VERIFYWISE_EMAIL", "admin@example.com");
    std::env::set_var("VERIFYWISE_PASSWORD", "secret");
    std::env::set_var("VERIFYWISE_MAX_RETRIES", "2");

    let tasks: Vec<_> = (0..8)
        .map(|_| tokio::spawn(verifywise_mcp::get_client()))
        .collect();
    let clients: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    assert_eq!(clients[0].base_url(), "http://127.0.0.1:3000");

    // Later configuration changes do not affect the shared client
    std::env::set_var("VERIFYWISE_BASE_URL", "http://example.invalid");
    let again = verifywise_mcp::get_client().await.unwrap();
    assert!(Arc::ptr_eq(&again, &clients[0]));
    assert_eq!(again.base_url(), "http://127.0.0.1:3000");
}
