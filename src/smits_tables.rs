//! Smits (1999) RGB-to-SPD basis tables, 32 samples over 380-720nm.
//! Transcribed from the reference Smits color extrapolator tables.

pub const SAMPLE_WAVELENGTHS: [f32; 32] = [
    3.8000000000e+02,
    3.9096774300e+02,
    4.0193548600e+02,
    4.1290322900e+02,
    4.2387097200e+02,
    4.3483871500e+02,
    4.4580645800e+02,
    4.5677420000e+02,
    4.6774194300e+02,
    4.7870968600e+02,
    4.8967742900e+02,
    5.0064517200e+02,
    5.1161291500e+02,
    5.2258062700e+02,
    5.3354834000e+02,
    5.4451605200e+02,
    5.5548376500e+02,
    5.6645147700e+02,
    5.7741918900e+02,
    5.8838690200e+02,
    5.9935461400e+02,
    6.1032232700e+02,
    6.2129003900e+02,
    6.3225775100e+02,
    6.4322546400e+02,
    6.5419317600e+02,
    6.6516088900e+02,
    6.7612860100e+02,
    6.8709631300e+02,
    6.9806402600e+02,
    7.0903173800e+02,
    7.2000000000e+02,
];

pub const SPECTRUM_WHITE: [f32; 32] = [
    1.1565232050e+00,
    1.1567225000e+00,
    1.1566203150e+00,
    1.1555782088e+00,
    1.1562175509e+00,
    1.1567674012e+00,
    1.1568023195e+00,
    1.1567677445e+00,
    1.1563563183e+00,
    1.1567054703e+00,
    1.1565134139e+00,
    1.1564336176e+00,
    1.1568023182e+00,
    1.1473147689e+00,
    1.1339317141e+00,
    1.1293876491e+00,
    1.1290515329e+00,
    1.0504864824e+00,
    1.0459696042e+00,
    9.9366687169e-01,
    9.5601669265e-01,
    9.2467482034e-01,
    9.1499944702e-01,
    8.9939467658e-01,
    8.9542520751e-01,
    8.8870566694e-01,
    8.8222843814e-01,
    8.7998311374e-01,
    8.7635244612e-01,
    8.8000368332e-01,
    8.8065665428e-01,
    8.8304706460e-01,
];

pub const SPECTRUM_CYAN: [f32; 32] = [
    1.1334479664e+00,
    1.1266762330e+00,
    1.1346827505e+00,
    1.1357395806e+00,
    1.1356371830e+00,
    1.1361152989e+00,
    1.1362179058e+00,
    1.1364819653e+00,
    1.1355107111e+00,
    1.1364060941e+00,
    1.1360363622e+00,
    1.1360122641e+00,
    1.1354266882e+00,
    1.1363099407e+00,
    1.1355450413e+00,
    1.1353732327e+00,
    1.1349496421e+00,
    1.1111113947e+00,
    9.0598740430e-01,
    6.1160780787e-01,
    2.9539752171e-01,
    9.5954200671e-02,
    -1.1650792031e-02,
    -1.2144633073e-02,
    -1.1148167570e-02,
    -1.1997606668e-02,
    -5.0506855475e-03,
    -7.9982745820e-03,
    -9.4722817708e-03,
    -5.5329541007e-03,
    -4.5428914028e-03,
    -1.2541015361e-02,
];

pub const SPECTRUM_MAGENTA: [f32; 32] = [
    1.0371892936e+00,
    1.0587542891e+00,
    1.0767271214e+00,
    1.0762706844e+00,
    1.0795289105e+00,
    1.0743644743e+00,
    1.0727028691e+00,
    1.0732447452e+00,
    1.0823760816e+00,
    1.0840545681e+00,
    9.5607567526e-01,
    5.5197896855e-01,
    8.4191094887e-02,
    8.7940070557e-05,
    -2.3086408335e-03,
    -1.1248136629e-03,
    -7.7297612755e-11,
    -2.7270769007e-04,
    1.4466473094e-02,
    2.5883116027e-01,
    5.2907999828e-01,
    9.0966624097e-01,
    1.0690571327e+00,
    1.0887326065e+00,
    1.0637622290e+00,
    1.0201812918e+00,
    1.0262196689e+00,
    1.0783085561e+00,
    9.8333849623e-01,
    1.0707246343e+00,
    1.0634247770e+00,
    1.0150875476e+00,
];

pub const SPECTRUM_YELLOW: [f32; 32] = [
    2.7756958966e-03,
    3.9673820991e-03,
    -1.4606936789e-04,
    3.6198394558e-04,
    -2.5819258699e-04,
    -5.0133191628e-05,
    -2.4437242866e-04,
    -7.8061419948e-05,
    4.9690301208e-02,
    4.8515973575e-01,
    1.0295725854e+00,
    1.0333210878e+00,
    1.0368102644e+00,
    1.0364884019e+00,
    1.0365427939e+00,
    1.0368595403e+00,
    1.0365645406e+00,
    1.0363938241e+00,
    1.0367205579e+00,
    1.0365239329e+00,
    1.0361531226e+00,
    1.0348785008e+00,
    1.0042729661e+00,
    8.4218486432e-01,
    7.3759394895e-01,
    6.5853154500e-01,
    6.0531682444e-01,
    5.9549794132e-01,
    5.9419261278e-01,
    5.6517682327e-01,
    5.6061186015e-01,
    5.8228610381e-01,
];

pub const SPECTRUM_RED: [f32; 32] = [
    5.4711187157e-02,
    5.5609066498e-02,
    6.0755873791e-02,
    5.6232948616e-02,
    4.6169940536e-02,
    3.8012808168e-02,
    2.4424225757e-02,
    3.8983580582e-03,
    -5.6082252173e-04,
    9.6493871255e-04,
    3.7341198052e-04,
    -4.3367389093e-04,
    -9.3533962257e-05,
    -1.2354967413e-04,
    -1.4524548082e-04,
    -2.0047691916e-04,
    -4.9938587695e-04,
    2.7255083540e-02,
    1.6067405906e-01,
    3.5069788873e-01,
    5.7357465538e-01,
    7.6392091891e-01,
    8.9144466740e-01,
    9.6394609910e-01,
    9.8879464276e-01,
    9.9897449966e-01,
    9.8605140404e-01,
    9.9532502805e-01,
    9.7433478377e-01,
    9.9134364617e-01,
    9.8866287772e-01,
    9.9713856090e-01,
];

pub const SPECTRUM_GREEN: [f32; 32] = [
    2.5168388756e-02,
    3.9427438169e-02,
    6.2059571596e-03,
    7.1120859807e-03,
    2.1760044649e-04,
    7.3271839984e-12,
    -2.1623066217e-02,
    1.5670209409e-02,
    2.8019603189e-03,
    3.2494773800e-01,
    1.0164917292e+00,
    1.0329476658e+00,
    1.0321586963e+00,
    1.0358667412e+00,
    1.0151235477e+00,
    1.0338076690e+00,
    1.0371372378e+00,
    1.0361377028e+00,
    1.0229822433e+00,
    9.6910327336e-01,
    -5.1785923900e-03,
    1.1131261971e-03,
    6.6675503033e-03,
    7.4024315686e-04,
    2.1591567633e-02,
    5.1481620056e-03,
    1.4561928646e-03,
    1.6414511045e-04,
    -6.4630764968e-03,
    1.0250854719e-02,
    4.2387394734e-02,
    2.1252716927e-02,
];

pub const SPECTRUM_BLUE: [f32; 32] = [
    1.0570490759e+00,
    1.0538466913e+00,
    1.0550494258e+00,
    1.0530407755e+00,
    1.0579930596e+00,
    1.0578439495e+00,
    1.0583132387e+00,
    1.0579712943e+00,
    1.0561884234e+00,
    1.0571399285e+00,
    1.0425795188e+00,
    3.2603084374e-01,
    -1.9255628442e-03,
    -1.2959221137e-03,
    -1.4357356277e-03,
    -1.2963697250e-03,
    -1.9227081162e-03,
    1.2621152526e-03,
    -1.6095249004e-03,
    -1.3029983818e-03,
    -1.7666600874e-03,
    -1.2325281140e-03,
    1.0316809673e-02,
    3.1284512648e-02,
    8.8773879882e-02,
    1.3873621740e-01,
    1.5535067532e-01,
    1.4878477178e-01,
    1.6624255403e-01,
    1.6997613961e-01,
    1.5769743996e-01,
    1.9069090525e-01,
];

pub const REFLECTOR_WHITE: [f32; 32] = [
    1.0618958571e+00,
    1.0615019980e+00,
    1.0614335380e+00,
    1.0622711655e+00,
    1.0622036218e+00,
    1.0625059965e+00,
    1.0623938487e+00,
    1.0624706448e+00,
    1.0625048145e+00,
    1.0624366131e+00,
    1.0620694239e+00,
    1.0613167587e+00,
    1.0610334029e+00,
    1.0613868565e+00,
    1.0614215366e+00,
    1.0620336151e+00,
    1.0625497455e+00,
    1.0624317488e+00,
    1.0625249141e+00,
    1.0624277664e+00,
    1.0624749854e+00,
    1.0625538581e+00,
    1.0625326910e+00,
    1.0623922312e+00,
    1.0623650980e+00,
    1.0625256477e+00,
    1.0612277620e+00,
    1.0594262609e+00,
    1.0599810758e+00,
    1.0602547314e+00,
    1.0601263046e+00,
    1.0606565757e+00,
];

pub const REFLECTOR_CYAN: [f32; 32] = [
    1.0414628021e+00,
    1.0328661534e+00,
    1.0126146229e+00,
    1.0350460525e+00,
    1.0078661447e+00,
    1.0422280385e+00,
    1.0442596738e+00,
    1.0535238290e+00,
    1.0180776227e+00,
    1.0442729909e+00,
    1.0529362542e+00,
    1.0537034271e+00,
    1.0533901869e+00,
    1.0537782701e+00,
    1.0527093770e+00,
    1.0530449040e+00,
    1.0550554640e+00,
    1.0553673611e+00,
    1.0454306635e+00,
    6.2348950639e-01,
    1.8038071613e-01,
    -7.6303759202e-03,
    -1.5217847036e-04,
    -7.5102257347e-03,
    -2.1708639328e-03,
    6.5919466602e-04,
    1.2278815319e-02,
    -4.4669775637e-03,
    1.7119799083e-02,
    4.9211089760e-03,
    5.8762925143e-03,
    2.5259399416e-02,
];

pub const REFLECTOR_MAGENTA: [f32; 32] = [
    9.9422138151e-01,
    9.8986937123e-01,
    9.8293658286e-01,
    9.9627868400e-01,
    1.0198955019e+00,
    1.0166395501e+00,
    1.0220913179e+00,
    9.9651666041e-01,
    1.0097766179e+00,
    1.0215422471e+00,
    6.4031953388e-01,
    2.5012379477e-03,
    6.5339939556e-03,
    2.8334080463e-03,
    -5.1209675389e-11,
    -9.0592291647e-03,
    3.3936718323e-03,
    -3.0638741122e-03,
    2.2203936168e-01,
    6.3141140025e-01,
    9.7480985577e-01,
    9.7209562334e-01,
    1.0173770303e+00,
    9.9875194323e-01,
    9.4701725740e-01,
    8.5258623154e-01,
    9.4897798582e-01,
    9.4751876097e-01,
    9.9598944191e-01,
    8.6301351504e-01,
    8.9150987854e-01,
    8.4866492653e-01,
];

pub const REFLECTOR_YELLOW: [f32; 32] = [
    5.5740622925e-03,
    -4.7982831631e-03,
    -5.2536564299e-03,
    -6.4571480044e-03,
    -5.9693514658e-03,
    -2.1836716038e-03,
    1.6781120601e-02,
    9.6096355429e-02,
    2.1217357082e-01,
    3.6169133291e-01,
    5.3961011543e-01,
    7.4408810492e-01,
    9.2209571148e-01,
    1.0460304298e+00,
    1.0513824989e+00,
    1.0511991822e+00,
    1.0510530912e+00,
    1.0517397230e+00,
    1.0516043087e+00,
    1.0511944032e+00,
    1.0511590326e+00,
    1.0516612465e+00,
    1.0514038527e+00,
    1.0515941029e+00,
    1.0511460437e+00,
    1.0515123759e+00,
    1.0508871370e+00,
    1.0508923708e+00,
    1.0477492816e+00,
    1.0493272144e+00,
    1.0435963333e+00,
    1.0392280772e+00,
];

pub const REFLECTOR_RED: [f32; 32] = [
    1.6575604867e-01,
    1.1846442803e-01,
    1.2408293330e-01,
    1.1371272058e-01,
    7.8992434519e-02,
    3.2205603593e-02,
    -1.0798365408e-02,
    1.8051975517e-02,
    5.3407196599e-03,
    1.3654918730e-02,
    -5.9564213546e-03,
    -1.8444365067e-03,
    -1.0571884362e-02,
    -2.9375521078e-03,
    -1.0790476272e-02,
    -8.0224306698e-03,
    -2.2669167702e-03,
    7.0200240495e-03,
    -8.1528469000e-03,
    6.0772866969e-01,
    9.8831560865e-01,
    9.9391691044e-01,
    1.0039338995e+00,
    9.9234499861e-01,
    9.9926530859e-01,
    1.0084621558e+00,
    9.8358296827e-01,
    1.0085023660e+00,
    9.7451138327e-01,
    9.8543269570e-01,
    9.3495763981e-01,
    9.8713907792e-01,
];

pub const REFLECTOR_GREEN: [f32; 32] = [
    2.6494153588e-03,
    -5.0175013430e-03,
    -1.2547236272e-02,
    -9.4554964308e-03,
    -1.2526086182e-02,
    -7.9170697760e-03,
    -7.9955735204e-03,
    -9.3559433444e-03,
    6.5468611983e-02,
    3.9572875518e-01,
    7.5244022300e-01,
    9.6376478690e-01,
    9.9854433855e-01,
    9.9992977025e-01,
    9.9939086751e-01,
    9.9994372267e-01,
    9.9939121813e-01,
    9.9911237310e-01,
    9.6019584878e-01,
    6.3186279338e-01,
    2.5797401029e-01,
    9.4014888527e-03,
    -3.0798345609e-03,
    -4.5230367034e-03,
    -6.8933410388e-03,
    -9.0352195539e-03,
    -8.5913667165e-03,
    -8.3690869120e-03,
    -7.8685832339e-03,
    -8.3657578711e-06,
    5.4301225443e-03,
    -2.7745589759e-03,
];

pub const REFLECTOR_BLUE: [f32; 32] = [
    9.9209771470e-01,
    9.8876426059e-01,
    9.9539040745e-01,
    9.9529317353e-01,
    9.9181447412e-01,
    1.0002584040e+00,
    9.9968478437e-01,
    9.9988120767e-01,
    9.8504012146e-01,
    7.9029849053e-01,
    5.6082198617e-01,
    3.3133458514e-01,
    1.3692410841e-01,
    1.8914906560e-02,
    -5.1129770933e-06,
    -4.2395493168e-04,
    -4.1934593102e-04,
    1.7473028136e-03,
    3.7999160178e-03,
    -5.5101474907e-04,
    -4.3716662898e-05,
    7.5874501749e-03,
    2.5795650781e-02,
    3.8168376533e-02,
    4.9489586408e-02,
    4.9595992290e-02,
    4.9814819506e-02,
    3.9840911065e-02,
    3.0501024937e-02,
    2.1243054765e-02,
    6.9596532104e-03,
    4.1733649331e-03,
];
