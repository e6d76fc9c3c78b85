//! Dashboard 驱动连接恢复测试
//!
//! 调用方超时丢弃请求后，连接上可能残留迟到的应答，下一次请求必须重建连接。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use teleop_driver::{DashboardDriver, DriverError, RobotDriver};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_reconnect_after_abandoned_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let index = counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 256];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                    if index == 0 {
                        // 第一条连接：迟到的应答
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        let _ = socket.write_all(b"-1,{},ClearError();").await;
                    } else {
                        let _ = socket.write_all(b"0,{},EnableRobot();").await;
                    }
                }
            });
        }
    });

    let driver = DashboardDriver::new(addr, Duration::from_secs(1));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), driver.clear_error()).await;
    assert!(abandoned.is_err());

    let code = driver.enable().await.unwrap();
    assert!(code.is_success());
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_closed_connection_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let _ = socket.read(&mut buf).await;
        // 不应答直接关闭
    });

    let driver = DashboardDriver::new(addr, Duration::from_secs(1));
    let err = driver.get_current_pose().await.unwrap_err();
    assert!(matches!(
        err,
        DriverError::ConnectionClosed | DriverError::Io(_)
    ));
}
