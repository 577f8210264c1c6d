// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 分发流水线
//!
//! 单个请求的状态机：
//!
//! ```text
//! ROUTING ──► NOT_FOUND ─────────────────────────────────────────► FINALIZED (404, {}, "")
//!    │
//!    └──► MATCHED ──► BEFORE_HOOKS ──► ABORTED ───────────────────► FINALIZED
//!                          │
//!                          └──► RAN_HANDLER ──► AFTER_HOOKS ──────► FINALIZED
//! ```
//!
//! 所有状态转换都发生在该请求独占的 [`Scope`] 内，任何阶段的 `Err` 都原样向外传递，
//! 交给外层的异常解析器处理。

use log::debug;

use crate::{
    app::Shared,
    error::AppError,
    handler::{invoke, Flow},
    params::Params,
    request::Request,
    response::{Headers, Response, ResponseBuilder},
    router,
};

/// 单个请求的执行上下文。
///
/// 持有应用原型状态的一份克隆，以及独占的请求与响应构建器；
/// 钩子、处理器与具名操作都在它上面执行。
pub struct Scope<A> {
    app: A,
    request: Request,
    response: ResponseBuilder,
}

impl<A> Scope<A> {
    pub fn new(app: A, request: Request) -> Self {
        Self {
            app,
            request,
            response: ResponseBuilder::new(),
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// 合并后的参数：查询串、表单正文与路径参数
    pub fn params(&self) -> &Params {
        self.request.params()
    }

    pub fn params_mut(&mut self) -> &mut Params {
        self.request.params_mut()
    }

    /// 取单值参数
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.params().get_str(name)
    }

    pub fn response(&self) -> &ResponseBuilder {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseBuilder {
        &mut self.response
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        self.response.headers_mut()
    }

    /// 取走当前构建器并产出三元组，构建器被重置为默认状态
    fn finalize(&mut self) -> Response {
        std::mem::take(&mut self.response).finish()
    }
}

/// 运行路由 → 前置钩子 → 处理器 → 后置钩子 → 收尾。
pub(crate) fn run<A>(shared: &Shared<A>, scope: &mut Scope<A>) -> Result<Response, AppError> {
    let id = scope.request.id();
    let method = scope.request.method();

    // ROUTING
    let (definition, path_params) = match router::route(&shared.routes, method, scope.request.path()) {
        Some(found) => found,
        None => {
            debug!("[ID{}]{} {} 没有匹配的路由，返回404", id, method, scope.request.path());
            return Ok(Response::not_found());
        }
    };
    debug!("[ID{}]匹配路由：{} {}", id, method, definition.pattern().source());

    // MATCHED：路径参数覆盖同名的查询/表单参数
    scope.params_mut().merge_path(path_params);

    // BEFORE_HOOKS
    for (index, hook) in shared.before_hooks.iter().enumerate() {
        if hook(scope)? == Flow::Abort {
            debug!("[ID{}]第{}个前置钩子中止了流水线，状态码：{}", id, index, scope.response.status());
            return Ok(scope.finalize());
        }
    }

    // RAN_HANDLER：返回值无条件覆盖正文
    let body = invoke(definition.handler(), &shared.operations, scope)?;
    scope.response.set_body(body);

    // AFTER_HOOKS
    for hook in &shared.after_hooks {
        hook(scope)?;
    }

    let response = scope.finalize();
    debug!("[ID{}]流水线完成，状态码：{}", id, response.status);
    Ok(response)
}
