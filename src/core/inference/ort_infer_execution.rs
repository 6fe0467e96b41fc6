use super::*;
use crate::core::errors::SimpleError;
use ndarray::ArrayView4;
use ort::value::TensorRef;

impl OrtInfer {
    /// Returns the configured or discovered output tensor name.
    fn get_output_name(&self) -> Result<String, OCRError> {
        if let Some(ref name) = self.output_name {
            return Ok(name.clone());
        }
        let session = self
            .sessions
            .first()
            .ok_or_else(|| OCRError::InvalidInput {
                message: "session pool is empty".to_string(),
            })?
            .lock()
            .map_err(|_| OCRError::InvalidInput {
                message: "Failed to acquire session lock".to_string(),
            })?;
        session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| OCRError::InvalidInput {
                message: "No outputs available in session - model may be invalid or corrupted"
                    .to_string(),
            })
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs the forward pass on an NCHW batch and returns the 4-D output tensor.
    ///
    /// Errors carry batch index 0; callers that track batches overwrite it.
    pub fn infer_4d(&self, x: &Tensor4D) -> Result<Tensor4D, OCRError> {
        let input_shape = x.shape().to_vec();

        let output_name = self.get_output_name().map_err(|e| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to get output name for model at '{}'",
                    self.model_path.display()
                ),
                e,
            )
        })?;

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "tensor_conversion",
                0,
                &input_shape,
                &format!("Failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self
            .next_idx
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.sessions.len().max(1);
        let session_mutex = self.sessions.get(idx).ok_or_else(|| {
            OCRError::inference_error(
                &self.model_name,
                "session pool is empty",
                SimpleError::new("no session available"),
            )
        })?;
        let mut session_guard = session_mutex.lock().map_err(|_| {
            OCRError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("Session lock acquisition failed"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "forward_pass",
                0,
                &input_shape,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    self.input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                OCRError::model_inference_error(
                    &self.model_name,
                    "output_extraction",
                    0,
                    &input_shape,
                    &format!("Failed to extract output tensor '{output_name}' as f32"),
                    e,
                )
            })?;
        let output_shape: &[i64] = output_shape;

        if output_shape.len() != 4 {
            return Err(OCRError::tensor_operation_error(
                "output_validation",
                &[4],
                &[output_shape.len()],
                &format!(
                    "Model '{}' 4D inference: expected 4D output tensor, got {}D with shape {:?}",
                    self.model_name,
                    output_shape.len(),
                    output_shape
                ),
                SimpleError::new("Invalid output tensor dimensions"),
            ));
        }

        let dims: Vec<usize> = output_shape
            .iter()
            .map(|&d| usize::try_from(d).unwrap_or(0))
            .collect();
        let expected_len: usize = dims.iter().product();
        if output_data.len() != expected_len {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "Output data size mismatch: expected {}, got {}",
                    expected_len,
                    output_data.len()
                ),
            });
        }

        let array_view = ArrayView4::from_shape((dims[0], dims[1], dims[2], dims[3]), output_data)
            .map_err(OCRError::Tensor)?;
        Ok(array_view.to_owned())
    }
}
