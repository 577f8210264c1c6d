use criterion::{black_box, criterion_group, criterion_main, Criterion};

use webdispatch::server::respond;
use webdispatch::{AppBuilder, Dispatcher, Flow, HttpRequestMethod, Request};

#[derive(Clone, Default)]
struct BenchApp {
    greeting: String,
}

fn build() -> Dispatcher<BenchApp> {
    let mut app = AppBuilder::new(BenchApp {
        greeting: "Hello".to_string(),
    });
    app.before(|s| {
        // 数组形式的 key 同样不等于 "23"
        if s.params().get("key").map_or(false, |key| key.as_str() != Some("23")) {
            s.response_mut().set_status(403);
            return Ok(Flow::Abort);
        }
        Ok(Flow::Continue)
    });
    app.after(|s| {
        s.response_mut().set_header("X-Bench", "1");
        Ok(())
    });
    app.get("/greet/:name", |s| {
        Ok(format!("{}, {}", s.app().greeting, s.param("name").unwrap_or_default()).into())
    })
    .unwrap();
    app.build().unwrap()
}

fn dispatch_benchmark(c: &mut Criterion) {
    let dispatcher = build();

    c.bench_function("dispatch_matched", |b| {
        b.iter(|| {
            let request = Request::new(HttpRequestMethod::Get, black_box("/greet/Ada?key=23"));
            dispatcher.dispatch(request).unwrap()
        })
    });
    c.bench_function("dispatch_aborted", |b| {
        b.iter(|| {
            let request = Request::new(HttpRequestMethod::Get, black_box("/greet/Ada?key=99"));
            dispatcher.dispatch(request).unwrap()
        })
    });
    c.bench_function("dispatch_not_found", |b| {
        b.iter(|| {
            let request = Request::new(HttpRequestMethod::Get, black_box("/missing"));
            dispatcher.dispatch(request).unwrap()
        })
    });
}

/// 原始字节进、原始字节出
fn respond_benchmark(c: &mut Criterion) {
    let dispatcher = build();
    let raw = b"GET /greet/Ada HTTP/1.1\r\n\
                Host: localhost:7878\r\n\
                User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                Accept: text/html\r\n\
                \r\n";

    c.bench_function("respond_raw", |b| {
        b.iter(|| respond(&dispatcher, black_box(raw), 0))
    });
}

criterion_group!(benches, dispatch_benchmark, respond_benchmark);
criterion_main!(benches);
