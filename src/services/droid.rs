use std::time::Duration;

use anyhow::Context;
use thirtyfour::{ChromeCapabilities, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tokio::sync::{Mutex, Semaphore};

fn session_capabilities() -> anyhow::Result<ChromeCapabilities> {
    let mut caps = DesiredCapabilities::chrome();
    caps.add_arg("--headless=new")?;
    caps.add_arg("--disable-gpu")?;
    Ok(caps)
}

// Sessions are stateful; a checkout holds one exclusively for the whole
// goto/source round trip.
pub struct Droid {
    drivers: Mutex<Vec<WebDriver>>,
    slots: Semaphore,
}

impl Droid {
    pub async fn connect(
        server_url: &str,
        pool_size: usize,
        page_load_timeout_secs: u64,
    ) -> anyhow::Result<Droid> {
        let mut drivers: Vec<WebDriver> = Vec::with_capacity(pool_size);
        for opened in 0..pool_size {
            let caps = session_capabilities()?;

            match WebDriver::new(server_url, caps).await {
                Ok(driver) => {
                    driver
                        .set_page_load_timeout(Duration::from_secs(page_load_timeout_secs))
                        .await?;
                    drivers.push(driver);
                }
                Err(e) => match opened {
                    0 => {
                        return Err(e)
                            .with_context(|| format!("webdriver unreachable at {}", server_url))
                    }
                    _ => {
                        log::warn!(
                            "Opened only {} of {} browser sessions: {}",
                            opened,
                            pool_size,
                            e
                        );
                        break;
                    }
                },
            }
        }

        let slots = Semaphore::new(drivers.len());
        log::info!("Browser pool ready with {} sessions", drivers.len());
        Ok(Droid {
            drivers: Mutex::new(drivers),
            slots,
        })
    }

    pub async fn page_source(&self, url: &str) -> anyhow::Result<String> {
        let _permit = self
            .slots
            .acquire()
            .await
            .context("browser pool closed")?;
        let driver = self
            .drivers
            .lock()
            .await
            .pop()
            .context("browser pool empty")?;

        let rendered = match driver.goto(url).await {
            Ok(()) => driver.source().await,
            Err(e) => Err(e),
        };
        self.drivers.lock().await.push(driver);

        Ok(rendered?)
    }

    pub async fn shutdown(&self) {
        let mut drivers = self.drivers.lock().await;
        for driver in drivers.drain(..) {
            if let Err(e) = driver.quit().await {
                log::warn!("Failed to close browser session: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::session_capabilities;

    #[test]
    fn session_capabilities_carry_the_headless_args() {
        let caps = session_capabilities().unwrap();
        let encoded = format!("{:?}", caps);
        assert!(encoded.contains("--headless=new"));
        assert!(encoded.contains("--disable-gpu"));
    }
}
