// Policy inference
pub mod onnx_policy;
pub mod policy_handle;

pub use onnx_policy::OnnxPolicy;
pub use policy_handle::PolicyHandle;
