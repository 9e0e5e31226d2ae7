bitflags::bitflags! {
    /// Architecture-neutral permissions of a leaf mapping.
    ///
    /// Each page-table format translates these into its own bits. Formats
    /// that cannot express a combination round it up to the nearest one they
    /// can (x86 has no execute-disable in 32-bit paging, so leaves there are
    /// always executable).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PagePermissions: u8 {
        /// The mapping can be read.
        const READ    = 1 << 0;

        /// The mapping can be written.
        const WRITE   = 1 << 1;

        /// Instructions can be fetched from the mapping.
        const EXECUTE = 1 << 2;

        /// The mapping is accessible from user mode.
        const USER    = 1 << 3;

        /// The translation survives address-space switches (kernel mappings).
        const GLOBAL  = 1 << 4;
    }
}

impl PagePermissions {
    /// Kernel data: read/write, no execute.
    pub const KERNEL_DATA: Self = Self::READ.union(Self::WRITE);

    /// Kernel text: read/execute.
    pub const KERNEL_TEXT: Self = Self::READ.union(Self::EXECUTE);

    /// User data: read/write, no execute.
    pub const USER_DATA: Self = Self::KERNEL_DATA.union(Self::USER);
}
