// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 应用注册与分发入口
//!
//! [`AppBuilder`] 在启动阶段收集路由、钩子、具名操作和异常处理器，
//! `build()` 之后冻结为 [`Dispatcher`]。这种类型拆分保证了所有注册都发生在
//! 第一次分发之前。
//!
//! 每次分发都会克隆一份应用原型状态 `A`，连同全新的请求与响应构建器组成
//! [`Scope`]；共享表只读，因此 `Dispatcher` 可以通过 `Arc` 在任意线程间无锁共享。
//!
//! ```rust,ignore
//! let mut app = AppBuilder::new(Greeter::default());
//! app.get("/greet/:name", |s| Ok(format!("Hello, {}", s.param("name").unwrap_or("")).into()))?;
//! app.rescue_from(|e: &InvalidAccount| Ok(Response::new(500, Headers::new(), e.to_string())));
//! let dispatcher = app.build()?;
//! let response = dispatcher.dispatch(Request::new(HttpRequestMethod::Get, "/greet/Ada"))?;
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use log::{debug, warn};

use crate::{
    error::AppError,
    exception::Exception,
    handler::{AfterHookFn, BeforeHookFn, ErrorOperationFn, Flow, Handler, Operations},
    matcher::{Constraints, Pattern},
    param::HttpRequestMethod,
    pipeline::{self, Scope},
    request::Request,
    rescue::{self, ExceptionHandlerTable},
    response::{Body, Response},
    router::{RouteDefinition, RouteTable},
};

/// 冻结后在所有请求间共享的只读表
pub(crate) struct Shared<A> {
    pub(crate) routes: RouteTable<A>,
    pub(crate) before_hooks: Vec<BeforeHookFn<A>>,
    pub(crate) after_hooks: Vec<AfterHookFn<A>>,
    pub(crate) operations: Operations<A>,
    pub(crate) error_operations: HashMap<String, ErrorOperationFn<A>>,
    pub(crate) rescuers: ExceptionHandlerTable,
}

pub struct AppBuilder<A> {
    prototype: A,
    shared: Shared<A>,
}

/// 为每个 HTTP 方法生成 `get` / `get_with` 这样的快捷注册方法
macro_rules! verb_routes {
    ($($verb:ident, $verb_with:ident => $method:expr;)*) => {
        $(
            #[doc = concat!("注册一条 `", stringify!($verb), "` 路由，处理器为内联闭包")]
            pub fn $verb<F>(&mut self, path: &str, f: F) -> Result<&mut Self, Exception>
            where
                F: Fn(&mut Scope<A>) -> Result<Body, AppError> + Send + Sync + 'static,
            {
                self.route($method, path, Constraints::new(), Handler::inline(f))
            }

            #[doc = concat!("带参数约束的 `", stringify!($verb), "` 路由")]
            pub fn $verb_with<F>(
                &mut self,
                path: &str,
                constraints: Constraints,
                f: F,
            ) -> Result<&mut Self, Exception>
            where
                F: Fn(&mut Scope<A>) -> Result<Body, AppError> + Send + Sync + 'static,
            {
                self.route($method, path, constraints, Handler::inline(f))
            }
        )*
    };
}

impl<A> AppBuilder<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// `prototype` 是每个请求克隆出的应用状态的原型
    pub fn new(prototype: A) -> Self {
        Self {
            prototype,
            shared: Shared {
                routes: RouteTable::new(),
                before_hooks: Vec::new(),
                after_hooks: Vec::new(),
                operations: HashMap::new(),
                error_operations: HashMap::new(),
                rescuers: ExceptionHandlerTable::new(),
            },
        }
    }

    /// 通用的路由注册。同一方法下的路由按注册顺序参与匹配，先注册者优先。
    pub fn route(
        &mut self,
        method: HttpRequestMethod,
        path: &str,
        constraints: Constraints,
        handler: Handler<A>,
    ) -> Result<&mut Self, Exception> {
        let pattern = Pattern::parse(path)?;
        for name in constraints.names() {
            if !pattern.param_names().any(|p| p == name) {
                warn!("路由{} {}的约束{}没有对应的路径参数，将被忽略", method, path, name);
            }
        }
        debug!("注册路由：{} {} -> {:?}", method, path, handler);
        self.shared
            .routes
            .push(method, RouteDefinition::new(pattern, constraints, handler));
        Ok(self)
    }

    /// 注册一条由具名操作处理的路由
    pub fn named(
        &mut self,
        method: HttpRequestMethod,
        path: &str,
        operation: &str,
    ) -> Result<&mut Self, Exception> {
        self.route(method, path, Constraints::new(), Handler::named(operation))
    }

    pub fn named_with(
        &mut self,
        method: HttpRequestMethod,
        path: &str,
        constraints: Constraints,
        operation: &str,
    ) -> Result<&mut Self, Exception> {
        self.route(method, path, constraints, Handler::named(operation))
    }

    verb_routes! {
        delete, delete_with => HttpRequestMethod::Delete;
        get, get_with => HttpRequestMethod::Get;
        head, head_with => HttpRequestMethod::Head;
        options, options_with => HttpRequestMethod::Options;
        patch, patch_with => HttpRequestMethod::Patch;
        post, post_with => HttpRequestMethod::Post;
        put, put_with => HttpRequestMethod::Put;
        trace, trace_with => HttpRequestMethod::Trace;
    }

    /// 前置钩子，按注册顺序执行。返回 `Flow::Abort` 将跳过处理器与后置钩子。
    pub fn before<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Scope<A>) -> Result<Flow, AppError> + Send + Sync + 'static,
    {
        self.shared.before_hooks.push(Arc::new(f));
        self
    }

    /// 后置钩子，只在前置钩子全部放行时执行
    pub fn after<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Scope<A>) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.shared.after_hooks.push(Arc::new(f));
        self
    }

    /// 具名操作，供 `Handler::Named` 引用
    pub fn operation<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Scope<A>) -> Result<Body, AppError> + Send + Sync + 'static,
    {
        self.shared.operations.insert(name.to_string(), Arc::new(f));
        self
    }

    /// 具名错误操作，供 `rescue_with` 引用
    pub fn error_operation<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Scope<A>, &AppError) -> Result<Response, AppError> + Send + Sync + 'static,
    {
        self.shared
            .error_operations
            .insert(name.to_string(), Arc::new(f));
        self
    }

    /// 为错误类型 `E` 注册内联处理器，其返回的响应即为最终响应
    pub fn rescue_from<E, F>(&mut self, f: F) -> &mut Self
    where
        E: Error + Send + Sync + 'static,
        F: Fn(&E) -> Result<Response, AppError> + Send + Sync + 'static,
    {
        self.shared.rescuers.insert_inline(f);
        self
    }

    /// 为错误类型 `E` 指定一个具名错误操作
    pub fn rescue_with<E>(&mut self, operation: &str) -> &mut Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.shared.rescuers.insert_named::<E>(operation);
        self
    }

    /// 冻结所有表，并校验每个具名引用都能找到对应的操作。
    pub fn build(self) -> Result<Dispatcher<A>, Exception> {
        for (_, definition) in self.shared.routes.iter() {
            if let Handler::Named(name) = definition.handler() {
                if !self.shared.operations.contains_key(name) {
                    return Err(Exception::UnknownOperation(name.clone()));
                }
            }
        }
        for name in self.shared.rescuers.named_operations() {
            if !self.shared.error_operations.contains_key(name) {
                return Err(Exception::UnknownOperation(name.to_string()));
            }
        }
        debug!(
            "应用已冻结：{}条路由，{}个前置钩子，{}个后置钩子，{}个异常处理器",
            self.shared.routes.len(),
            self.shared.before_hooks.len(),
            self.shared.after_hooks.len(),
            self.shared.rescuers.len()
        );
        Ok(Dispatcher {
            prototype: self.prototype,
            shared: Arc::new(self.shared),
        })
    }
}

/// 冻结后的应用，分发的入口
pub struct Dispatcher<A> {
    prototype: A,
    shared: Arc<Shared<A>>,
}

impl<A: Clone> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            prototype: self.prototype.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A> Dispatcher<A>
where
    A: Clone + Send + Sync + 'static,
{
    /// 处理一个请求，产出响应三元组。
    ///
    /// 流水线中任何阶段的错误都会在这里按精确类型解析一次；
    /// 无人处理的错误原样返回给调用方（通常是服务器边界）。
    pub fn dispatch(&self, request: Request) -> Result<Response, AppError> {
        let mut scope = Scope::new(self.prototype.clone(), request);
        match pipeline::run(&self.shared, &mut scope) {
            Ok(response) => Ok(response),
            Err(err) => rescue::resolve(
                &self.shared.rescuers,
                &self.shared.error_operations,
                &mut scope,
                err,
            ),
        }
    }

    pub fn prototype(&self) -> &A {
        &self.prototype
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Headers;

    #[derive(Clone, Default)]
    struct Counter {
        hits: u32,
    }

    #[test]
    fn test_build_rejects_unknown_route_operation() {
        let mut app = AppBuilder::new(());
        app.named(HttpRequestMethod::Get, "/hello", "hello").unwrap();
        assert!(matches!(app.build(), Err(Exception::UnknownOperation(name)) if name == "hello"));
    }

    #[test]
    fn test_build_rejects_unknown_error_operation() {
        let mut app = AppBuilder::new(());
        app.rescue_with::<Exception>("on_exception");
        assert!(matches!(app.build(), Err(Exception::UnknownOperation(_))));
    }

    #[test]
    fn test_route_rejects_bad_pattern() {
        let mut app = AppBuilder::new(());
        let result = app.get("/users/:", |_| Ok(Body::Empty)).map(|_| ());
        assert_eq!(result, Err(Exception::InvalidPattern("/users/:".to_string())));
    }

    /// 每个请求拿到的都是原型的一份新克隆，彼此的修改互不可见
    #[test]
    fn test_app_state_is_cloned_per_request() {
        let mut app = AppBuilder::new(Counter::default());
        app.get("/hit", |s| {
            s.app_mut().hits += 1;
            Ok(s.app().hits.to_string().into())
        })
        .unwrap();
        let dispatcher = app.build().unwrap();

        for _ in 0..3 {
            let response = dispatcher
                .dispatch(Request::new(HttpRequestMethod::Get, "/hit"))
                .unwrap();
            assert_eq!(response.body, Body::Text("1".to_string()));
        }
        assert_eq!(dispatcher.prototype().hits, 0);
    }

    #[test]
    fn test_dispatcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher<Counter>>();
    }

    #[test]
    fn test_every_verb_helper_registers_its_method() {
        let mut app = AppBuilder::new(());
        app.delete("/r", |_| Ok("DELETE".into())).unwrap();
        app.get("/r", |_| Ok("GET".into())).unwrap();
        app.head("/r", |_| Ok("HEAD".into())).unwrap();
        app.options("/r", |_| Ok("OPTIONS".into())).unwrap();
        app.patch("/r", |_| Ok("PATCH".into())).unwrap();
        app.post("/r", |_| Ok("POST".into())).unwrap();
        app.put("/r", |_| Ok("PUT".into())).unwrap();
        app.trace("/r", |_| Ok("TRACE".into())).unwrap();
        let dispatcher = app.build().unwrap();

        for verb in crate::param::HTTP_VERBS.iter() {
            let response = dispatcher.dispatch(Request::new(*verb, "/r")).unwrap();
            assert_eq!(response.body, Body::Text(verb.to_string()));
        }
    }

    #[test]
    fn test_rescue_bypasses_builder_state() {
        let mut app = AppBuilder::new(());
        app.get("/fail", |s| {
            s.response_mut().set_status(201).set_header("X-Partial", "1");
            Err(AppError::from(Exception::MalformedRequest))
        })
        .unwrap();
        app.rescue_from(|_: &Exception| Ok(Response::new(500, Headers::new(), "boom")));
        let dispatcher = app.build().unwrap();

        let response = dispatcher
            .dispatch(Request::new(HttpRequestMethod::Get, "/fail"))
            .unwrap();
        assert_eq!(response, Response::new(500, Headers::new(), "boom"));
    }
}
