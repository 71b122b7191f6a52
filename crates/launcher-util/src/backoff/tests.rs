use super::*;

#[tokio::test(start_paused = true)]
async fn wait_for_retries_until_success() {
    let mut attempts = 0;
    let result: Result<u32, &str> = wait_for(
        || {
            attempts += 1;
            if attempts < 3 {
                Err("busy")
            } else {
                Ok(attempts)
            }
        },
        Duration::from_secs(5),
        Duration::from_secs(1),
    )
    .await;
    assert_eq!(result, Ok(3));
}

#[tokio::test(start_paused = true)]
async fn wait_for_gives_up_after_timeout() {
    let started = Instant::now();
    let mut attempts = 0;
    let result: Result<(), &str> = wait_for(
        || {
            attempts += 1;
            Err("still busy")
        },
        Duration::from_secs(5),
        Duration::from_secs(1),
    )
    .await;
    assert_eq!(result, Err("still busy"));
    assert_eq!(attempts, 6);
    assert!(started.elapsed() <= Duration::from_secs(5));
}
