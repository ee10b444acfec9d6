use burn::{
    nn::{GroupNorm, GroupNormConfig},
    prelude::*,
};

use crate::error::{DscNetError, DscNetResult};

/// Rejects kernel sizes without a center tap.
pub fn check_kernel_size(kernel_size: usize) -> DscNetResult<()> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(DscNetError::InvalidKernelSize { kernel_size });
    }
    Ok(())
}

/// Number of groups used to normalize `channels` channels (one group per four channels).
pub fn group_norm_groups(channels: usize) -> DscNetResult<usize> {
    let groups = channels / 4;
    if groups == 0 || channels % groups != 0 {
        return Err(DscNetError::InvalidConfiguration {
            reason: format!(
                "group norm needs at least 4 channels split evenly into channels / 4 groups, got {channels}"
            ),
        });
    }
    Ok(groups)
}

pub fn build_group_norm<B: Backend>(
    channels: usize,
    device: &Device<B>,
) -> DscNetResult<GroupNorm<B>> {
    let groups = group_norm_groups(channels)?;
    Ok(GroupNormConfig::new(groups, channels).init(device))
}
