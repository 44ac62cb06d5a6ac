use std::future::Future;

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

/// Runs `f` over `items` in consecutive windows of `window` items.
///
/// Members of a window run concurrently; the next window starts only after the
/// whole current one resolves. Output order matches input order.
pub async fn run_windowed<'a, T, R, F, Fut>(
    items: &'a [T],
    window: usize,
    pb: &ProgressBar,
    f: F,
) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut out = Vec::with_capacity(items.len());
    for chunk in items.chunks(window.max(1)) {
        let results = join_all(chunk.iter().map(&f)).await;
        out.extend(results);
        pb.inc(chunk.len() as u64);
    }
    out
}

pub fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_order_across_windows() {
        let items: Vec<u64> = (0..7).collect();
        // Later items finish first inside each window.
        let out = run_windowed(&items, 3, &ProgressBar::hidden(), |n| {
            let n = *n;
            async move {
                tokio::time::sleep(Duration::from_millis(10 * (7 - n))).await;
                n * 10
            }
        })
        .await;
        assert_eq!(out, vec![0, 10, 20, 30, 40, 50, 60]);
    }

    #[tokio::test]
    async fn never_more_than_window_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..12).collect();

        run_windowed(&items, 5, &ProgressBar::hidden(), |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn zero_window_treated_as_one() {
        let out = run_windowed(&[1, 2], 0, &ProgressBar::hidden(), |n| {
            let n = *n;
            async move { n }
        })
        .await;
        assert_eq!(out, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_input_never_calls() {
        let calls = AtomicUsize::new(0);
        let out: Vec<()> = run_windowed(&[] as &[u8], 5, &ProgressBar::hidden(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await;
        assert!(out.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
