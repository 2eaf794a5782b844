use anyhow::{ensure, Result};
use candle_core::Tensor;

/// Mean of the hidden states over unmasked tokens: `[B,T,H] x [B,T] -> [B,H]`.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {dims:?}");

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let masked = hidden.broadcast_mul(&mask.unsqueeze(2)?)?;
    let sum = masked.sum(1)?;
    // all-padding rows would divide by zero
    let lengths = mask.sum_keepdim(1)?.clamp(1f32, f32::MAX)?.to_dtype(sum.dtype())?;
    Ok(sum.broadcast_div(&lengths)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn ignores_padded_positions() {
        let dev = Device::Cpu;
        // one sequence, three tokens, two dims; the last token is padding
        let hidden = Tensor::new(&[[[1f32, 2.], [3., 4.], [100., 100.]]], &dev).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &dev).unwrap();
        let pooled = masked_mean(&hidden, &mask).unwrap().to_dtype(DType::F32).unwrap();
        assert_eq!(pooled.to_vec2::<f32>().unwrap(), vec![vec![2.0, 3.0]]);
    }
}
