//! Shared test helper macro for setting operator headers on a request.
//! Usage: operator_headers!(req, user="emp-0001", name="Somchai", trace="<uuid>");
#[macro_export]
macro_rules! operator_headers {
    ($req:expr, user=$user:expr, name=$name:expr, trace=$trace:expr) => {{
        $crate::operator_headers!($req, user = $user, name = $name);
        $req.headers_mut().insert("X-Trace-ID", ::axum::http::HeaderValue::from_str($trace).unwrap());
    }};
    ($req:expr, user=$user:expr, name=$name:expr) => {{
        $crate::operator_headers!($req, user = $user);
        $req.headers_mut().insert("X-User-Name", ::axum::http::HeaderValue::from_str($name).unwrap());
    }};
    ($req:expr, user=$user:expr) => {{
        $req.headers_mut().insert("X-User-ID", ::axum::http::HeaderValue::from_str($user).unwrap());
    }};
}
